//! Call-scoped request context.
//!
//! A [`RequestContext`] is created when a call enters either transport and
//! lives until the transport has written its response. It is passed to the
//! dispatcher explicitly and is also installed as a tokio task-local for the
//! duration of the call so log lines can carry the request id without
//! threading it through every function.

use std::fmt;
use std::future::Future;

use axum::http::HeaderMap;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const API_KEY_HEADER: &str = "x-api-key";

tokio::task_local! {
    static CURRENT: RequestContext;
}

/// Caller credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Accepts a raw key or a `Bearer <key>` value. Blank input yields `None`.
    pub fn new(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let key = raw
            .strip_prefix("Bearer ")
            .or_else(|| raw.strip_prefix("bearer "))
            .unwrap_or(raw)
            .trim();
        if key.is_empty() {
            None
        } else {
            Some(Credential(key.to_string()))
        }
    }

    /// `X-API-Key` wins over `Authorization`.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        header_str(headers, API_KEY_HEADER)
            .and_then(Credential::new)
            .or_else(|| header_str(headers, "authorization").and_then(Credential::new))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn redacted(&self) -> String {
        if self.0.chars().count() > 8 {
            let prefix: String = self.0.chars().take(8).collect();
            format!("{prefix}...")
        } else {
            "***".to_string()
        }
    }

    /// Timing-independent comparison against the configured secret.
    pub fn matches(&self, expected: &str) -> bool {
        let a = self.0.as_bytes();
        let b = expected.as_bytes();
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.redacted())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    credential: Option<Credential>,
}

impl RequestContext {
    /// Start a context, keeping a non-blank incoming id or generating one.
    pub fn begin(incoming_request_id: Option<&str>) -> Self {
        let request_id = incoming_request_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            request_id,
            credential: None,
        }
    }

    /// Build from inbound HTTP headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::begin(header_str(headers, REQUEST_ID_HEADER))
            .with_credential(Credential::from_headers(headers))
    }

    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Run `fut` with this context installed as the current one. The context
    /// is discarded when the future completes.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CURRENT.scope(self, fut).await
    }

    /// Context of the call running on this task, if any.
    pub fn current() -> Option<RequestContext> {
        CURRENT.try_with(Clone::clone).ok()
    }
}

pub fn current_request_id() -> Option<String> {
    CURRENT.try_with(|ctx| ctx.request_id.clone()).ok()
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
