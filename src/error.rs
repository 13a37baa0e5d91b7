//! Error taxonomy for action dispatch.
//!
//! Every failure raised between the transport entry point and the envelope
//! formatter is one of the types below. None of them escape as a transport
//! level crash: the dispatcher turns them into a [`DispatchError`] and the
//! envelope formatter renders that for the caller.

use axum::http::StatusCode;
use thiserror::Error;

use crate::action::validate::{ValidationError, ValidationFailure};

/// Failure classification shared by both transports and both invokers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ActionNotFound,
    InvalidRequest,
    EmptyResponse,
    HandlerError,
    UpstreamUnavailable,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ActionNotFound => "action_not_found",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::EmptyResponse => "empty_response",
            FailureKind::HandlerError => "handler_error",
            FailureKind::UpstreamUnavailable => "upstream_unavailable",
        }
    }

    /// Parse the wire code emitted in a REST failure payload.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "action_not_found" => Some(FailureKind::ActionNotFound),
            "invalid_request" => Some(FailureKind::InvalidRequest),
            "empty_response" => Some(FailureKind::EmptyResponse),
            "handler_error" => Some(FailureKind::HandlerError),
            "upstream_unavailable" => Some(FailureKind::UpstreamUnavailable),
            _ => None,
        }
    }

    /// HTTP status used by the REST surface.
    pub fn status(&self) -> StatusCode {
        match self {
            FailureKind::ActionNotFound => StatusCode::NOT_FOUND,
            FailureKind::InvalidRequest => StatusCode::BAD_REQUEST,
            FailureKind::EmptyResponse => StatusCode::BAD_GATEWAY,
            FailureKind::HandlerError => StatusCode::INTERNAL_SERVER_ERROR,
            FailureKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display prefix of [`DispatchError::InvalidRequest`].
const INVALID_REQUEST_PREFIX: &str = "Invalid request: ";

/// One offending field of a rejected request, as rendered under `details`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl From<&ValidationError> for FieldIssue {
    fn from(err: &ValidationError) -> Self {
        FieldIssue {
            field: err.field().to_string(),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Failure outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Action '{action}' not found")]
    ActionNotFound { action: String },

    /// Schema validation failed; `details` carries one entry per offending field.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        details: Vec<FieldIssue>,
    },

    #[error("{message}")]
    EmptyResponse { message: String },

    #[error("{message}")]
    HandlerError { message: String },

    #[error("{message}")]
    UpstreamUnavailable { message: String },
}

impl DispatchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DispatchError::ActionNotFound { .. } => FailureKind::ActionNotFound,
            DispatchError::InvalidRequest { .. } => FailureKind::InvalidRequest,
            DispatchError::EmptyResponse { .. } => FailureKind::EmptyResponse,
            DispatchError::HandlerError { .. } => FailureKind::HandlerError,
            DispatchError::UpstreamUnavailable { .. } => FailureKind::UpstreamUnavailable,
        }
    }

    pub fn not_found(action: impl Into<String>) -> Self {
        DispatchError::ActionNotFound {
            action: action.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        DispatchError::InvalidRequest {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn empty(message: impl Into<String>) -> Self {
        DispatchError::EmptyResponse {
            message: message.into(),
        }
    }

    pub fn handler(message: impl Into<String>) -> Self {
        DispatchError::HandlerError {
            message: message.into(),
        }
    }

    /// Rebuild a failure from a remote tool server's classification.
    /// `message` is the rendered error text, prefix included.
    pub fn from_kind(kind: FailureKind, action: &str, message: String, details: Vec<FieldIssue>) -> Self {
        match kind {
            FailureKind::ActionNotFound => DispatchError::not_found(action),
            FailureKind::InvalidRequest => DispatchError::InvalidRequest {
                message: message
                    .strip_prefix(INVALID_REQUEST_PREFIX)
                    .map(str::to_string)
                    .unwrap_or(message),
                details,
            },
            FailureKind::EmptyResponse => DispatchError::EmptyResponse { message },
            FailureKind::HandlerError => DispatchError::HandlerError { message },
            FailureKind::UpstreamUnavailable => DispatchError::UpstreamUnavailable { message },
        }
    }

    pub fn details(&self) -> &[FieldIssue] {
        match self {
            DispatchError::InvalidRequest { details, .. } => details,
            _ => &[],
        }
    }
}

impl From<ValidationFailure> for DispatchError {
    fn from(failure: ValidationFailure) -> Self {
        DispatchError::InvalidRequest {
            message: failure.to_string(),
            details: failure.errors.iter().map(FieldIssue::from).collect(),
        }
    }
}

/// Failure reported by a capability implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputerError {
    /// The device interaction itself failed.
    #[error("{0}")]
    Device(String),

    /// The handler produced nothing where output was expected.
    #[error("{0}")]
    Empty(String),

    /// The remote tool server could not be reached.
    #[error("{0}")]
    Unavailable(String),

    /// The remote tool server answered with a classified failure.
    #[error("{message}")]
    Remote {
        kind: FailureKind,
        message: String,
        details: Vec<FieldIssue>,
    },
}

impl ComputerError {
    pub fn device(message: impl Into<String>) -> Self {
        ComputerError::Device(message.into())
    }

    /// Classify at the dispatcher boundary.
    pub fn into_dispatch(self, action: &str) -> DispatchError {
        match self {
            ComputerError::Device(message) => DispatchError::HandlerError { message },
            ComputerError::Empty(message) => DispatchError::EmptyResponse { message },
            ComputerError::Unavailable(message) => DispatchError::UpstreamUnavailable { message },
            ComputerError::Remote { kind, message, details } => {
                DispatchError::from_kind(kind, action, message, details)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_codes_round_trip() {
        for kind in [
            FailureKind::ActionNotFound,
            FailureKind::InvalidRequest,
            FailureKind::EmptyResponse,
            FailureKind::HandlerError,
            FailureKind::UpstreamUnavailable,
        ] {
            assert_eq!(FailureKind::from_code(kind.as_str()), Some(kind));
        }
        assert_eq!(FailureKind::from_code("nope"), None);
    }

    #[test]
    fn remote_failures_keep_their_kind() {
        let err = ComputerError::Remote {
            kind: FailureKind::EmptyResponse,
            message: "nothing".into(),
            details: Vec::new(),
        };
        let dispatched = err.into_dispatch("take_screenshot");
        assert_eq!(dispatched.kind(), FailureKind::EmptyResponse);
        assert_eq!(dispatched.to_string(), "nothing");

        let err = ComputerError::Remote {
            kind: FailureKind::ActionNotFound,
            message: "Action 'scroll' not found".into(),
            details: Vec::new(),
        };
        assert_eq!(
            err.into_dispatch("scroll"),
            DispatchError::not_found("scroll")
        );
    }

    #[test]
    fn remote_invalid_request_is_not_prefixed_twice() {
        let local = DispatchError::from(ValidationFailure {
            errors: vec![ValidationError::MissingField { field: "x" }],
        });
        let remote = ComputerError::Remote {
            kind: FailureKind::InvalidRequest,
            message: local.to_string(),
            details: local.details().to_vec(),
        }
        .into_dispatch("move_mouse");
        assert_eq!(remote.to_string(), "Invalid request: field 'x' is required");
        assert_eq!(remote, local);

        let bare = DispatchError::from_kind(FailureKind::InvalidRequest, "wait", "bad".into(), Vec::new());
        assert_eq!(bare.to_string(), "Invalid request: bad");
    }

    #[test]
    fn statuses_follow_kind() {
        assert_eq!(DispatchError::not_found("x").kind().status(), StatusCode::NOT_FOUND);
        assert_eq!(DispatchError::invalid("bad").kind().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ComputerError::Unavailable("down".into())
                .into_dispatch("wait")
                .kind()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
