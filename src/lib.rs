//! computer-use-mcp - computer use action dispatch
//!
//! Mouse, keyboard and screenshot actions exposed as MCP tools and as a REST
//! tool server, dispatched through one canonicalize / validate / invoke path.

pub mod action;
pub mod args;
pub mod computer;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod drag;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod web;

// Re-exports
pub use action::naming::{to_canonical, to_wire_alias, WireStyle};
pub use action::validate::{validate, RequestObject, ValidationError};
pub use action::{Action, ActionDescriptor, Registry};
pub use computer::{ActionOutput, Backend, Computer};
pub use config::Config;
pub use context::{Credential, RequestContext};
pub use dispatch::{DispatchResult, Dispatcher};
pub use drag::{generate_path, DragPath, PathPoint};
pub use error::{ComputerError, DispatchError, FailureKind, FieldIssue};
