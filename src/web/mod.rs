//! REST tool server
//!
//! Exposes every registered action at `POST {api_prefix}/computer/{Action}`
//! and replies with response envelopes.

pub mod http_server;
pub mod middleware;

use std::sync::Arc;
use std::time::Instant;

use crate::computer::Computer;
use crate::config::Config;
use crate::dispatch::Dispatcher;

pub use http_server::{router, run_http_server};

/// Shared state for the REST server
pub struct AppState {
    pub config: Arc<Config>,
    pub computer: Arc<dyn Computer>,
    pub dispatcher: Dispatcher,
    start_time: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>, computer: Arc<dyn Computer>) -> Self {
        Self {
            config,
            computer,
            dispatcher: Dispatcher::default(),
            start_time: Instant::now(),
        }
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}
