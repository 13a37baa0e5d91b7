//! Remote proxy: forwards each action to a REST tool server.
//!
//! The caller's credential and request id travel as `X-API-Key` and
//! `X-Request-ID`. Replies are envelopes; the `Result` payload is parsed
//! back into the same types the local driver returns.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;

use super::{Backend, Computer, CursorPosition, ScreenSize, Screenshot, PNG_MIME};
use crate::action::{Action, ButtonAt, ClickMouse, DragMouse, MoveMouse, PressKey, Scroll, TypeText, Wait};
use crate::context::{Credential, RequestContext, API_KEY_HEADER, REQUEST_ID_HEADER};
use crate::error::{ComputerError, FailureKind, FieldIssue};

pub struct RemoteBackend {
    client: reqwest::Client,
    endpoint: Option<String>,
    /// Used when the call carries no credential of its own.
    fallback_credential: Option<Credential>,
}

impl RemoteBackend {
    pub fn new(
        endpoint: Option<String>,
        timeout: Duration,
        fallback_credential: Option<Credential>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            fallback_credential,
        })
    }
}

impl Backend for RemoteBackend {
    type Computer = RemoteComputer;

    fn bind(&self, ctx: &RequestContext, endpoint: Option<&str>) -> Result<RemoteComputer, ComputerError> {
        let base_url = endpoint
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .or(self.endpoint.as_deref())
            .ok_or_else(|| ComputerError::Unavailable("no tool server endpoint configured".into()))?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ComputerError::Unavailable(format!(
                "tool server endpoint must be an http(s) URL: {base_url}"
            )));
        }

        Ok(RemoteComputer {
            client: self.client.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: ctx.credential().cloned().or_else(|| self.fallback_credential.clone()),
            request_id: ctx.request_id().to_string(),
        })
    }

    fn is_remote(&self) -> bool {
        true
    }
}

/// Invoker bound to one call.
pub struct RemoteComputer {
    client: reqwest::Client,
    base_url: String,
    credential: Option<Credential>,
    request_id: String,
}

impl RemoteComputer {
    pub fn url_for(&self, action: &Action) -> String {
        format!("{}/api/computer/{}", self.base_url, action.wire_name())
    }

    async fn call(&self, action: &Action) -> Result<Value, ComputerError> {
        let url = self.url_for(action);
        debug!(
            "forwarding {} to {} (credential {})",
            action.name(),
            url,
            self.credential.as_ref().map_or_else(|| "none".to_string(), Credential::redacted)
        );

        let mut request = self
            .client
            .post(&url)
            .header(REQUEST_ID_HEADER, &self.request_id)
            .json(&action.wire_params());
        if let Some(credential) = &self.credential {
            request = request.header(API_KEY_HEADER, credential.expose());
        }

        let response = request.send().await.map_err(|e| {
            warn!("tool server unreachable at {}: {}", url, e);
            ComputerError::Unavailable(format!("tool server unreachable: {e}"))
        })?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            ComputerError::Unavailable(format!("failed to read tool server response: {e}"))
        })?;
        let body: Option<Value> = serde_json::from_slice(&body).ok();
        interpret_reply(status, body)
    }

    async fn side_effect(&self, action: Action) -> Result<(), ComputerError> {
        self.call(&action).await.map(|_| ())
    }
}

/// Classify a tool server reply and extract its `Result` payload.
pub fn interpret_reply(status: u16, body: Option<Value>) -> Result<Value, ComputerError> {
    let success = (200..300).contains(&status);
    let result = body
        .as_ref()
        .and_then(|b| b.get("Result"))
        .filter(|r| !r.is_null())
        .cloned();

    let Some(result) = result else {
        return Err(if success {
            ComputerError::Empty("tool server returned an empty response".into())
        } else {
            ComputerError::Unavailable(format!("tool server responded with status {status}"))
        });
    };

    if let Some(message) = result.get("error").and_then(Value::as_str) {
        let kind = result
            .get("code")
            .and_then(Value::as_str)
            .and_then(FailureKind::from_code)
            .unwrap_or(FailureKind::HandlerError);
        return Err(ComputerError::Remote {
            kind,
            message: message.to_string(),
            details: parse_details(&result),
        });
    }
    if !success {
        return Err(ComputerError::Remote {
            kind: FailureKind::HandlerError,
            message: format!("tool server responded with status {status}"),
            details: Vec::new(),
        });
    }
    Ok(result)
}

/// Per-field entries of a validation failure. Malformed entries are skipped.
fn parse_details(result: &Value) -> Vec<FieldIssue> {
    let Some(entries) = result.get("details").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let text = |key: &str| entry.get(key).and_then(Value::as_str).map(str::to_string);
            Some(FieldIssue {
                field: text("field")?,
                code: text("code")?,
                message: text("message")?,
            })
        })
        .collect()
}

fn int_field(result: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| result.get(*k)).and_then(Value::as_i64)
}

fn malformed(what: &str) -> ComputerError {
    ComputerError::Device(format!("tool server returned a malformed {what}"))
}

pub fn parse_cursor(result: &Value) -> Result<CursorPosition, ComputerError> {
    let x = int_field(result, &["PositionX", "x"]).and_then(|v| i32::try_from(v).ok());
    let y = int_field(result, &["PositionY", "y"]).and_then(|v| i32::try_from(v).ok());
    match (x, y) {
        (Some(x), Some(y)) => Ok(CursorPosition { x, y }),
        _ => Err(malformed("cursor position")),
    }
}

pub fn parse_screen_size(result: &Value) -> Result<ScreenSize, ComputerError> {
    let width = int_field(result, &["Width", "width"]).and_then(|v| u32::try_from(v).ok());
    let height = int_field(result, &["Height", "height"]).and_then(|v| u32::try_from(v).ok());
    match (width, height) {
        (Some(width), Some(height)) => Ok(ScreenSize { width, height }),
        _ => Err(malformed("screen size")),
    }
}

pub fn parse_screenshot(result: &Value) -> Result<Screenshot, ComputerError> {
    let data = ["Screenshot", "screenshot"]
        .iter()
        .find_map(|k| result.get(*k))
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("screenshot"))?;
    let mime_type = ["MimeType", "mime_type"]
        .iter()
        .find_map(|k| result.get(*k))
        .and_then(Value::as_str)
        .unwrap_or(PNG_MIME);
    Ok(Screenshot {
        data: data.to_string(),
        mime_type: mime_type.to_string(),
    })
}

#[async_trait]
impl Computer for RemoteComputer {
    async fn move_mouse(&self, request: &MoveMouse) -> Result<(), ComputerError> {
        self.side_effect(Action::MoveMouse(*request)).await
    }

    async fn click_mouse(&self, request: &ClickMouse) -> Result<(), ComputerError> {
        self.side_effect(Action::ClickMouse(*request)).await
    }

    async fn press_mouse(&self, request: &ButtonAt) -> Result<(), ComputerError> {
        self.side_effect(Action::PressMouse(*request)).await
    }

    async fn release_mouse(&self, request: &ButtonAt) -> Result<(), ComputerError> {
        self.side_effect(Action::ReleaseMouse(*request)).await
    }

    async fn drag_mouse(&self, request: &DragMouse) -> Result<(), ComputerError> {
        self.side_effect(Action::DragMouse(*request)).await
    }

    async fn scroll(&self, request: &Scroll) -> Result<(), ComputerError> {
        self.side_effect(Action::Scroll(*request)).await
    }

    async fn press_key(&self, request: &PressKey) -> Result<(), ComputerError> {
        self.side_effect(Action::PressKey(request.clone())).await
    }

    async fn type_text(&self, request: &TypeText) -> Result<(), ComputerError> {
        self.side_effect(Action::TypeText(request.clone())).await
    }

    async fn wait(&self, request: &Wait) -> Result<(), ComputerError> {
        self.side_effect(Action::Wait(*request)).await
    }

    async fn take_screenshot(&self) -> Result<Screenshot, ComputerError> {
        parse_screenshot(&self.call(&Action::TakeScreenshot).await?)
    }

    async fn get_cursor_position(&self) -> Result<CursorPosition, ComputerError> {
        parse_cursor(&self.call(&Action::GetCursorPosition).await?)
    }

    async fn get_screen_size(&self) -> Result<ScreenSize, ComputerError> {
        parse_screen_size(&self.call(&Action::GetScreenSize).await?)
    }
}
