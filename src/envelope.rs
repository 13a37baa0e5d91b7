//! Rendering of dispatch results for each transport.
//!
//! REST replies are `{ResponseMetadata: {RequestId, Action, Version}, Result}`
//! with a status code derived from the failure kind. Tool protocol replies are
//! content blocks; failures become a single `Error: ...` text block.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rmcp::model::{CallToolResult, Content};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::computer::ActionOutput;
use crate::context::{RequestContext, REQUEST_ID_HEADER};
use crate::dispatch::DispatchResult;
use crate::error::DispatchError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SUCCESS_OUTPUT: &str = "Operation successful";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseMetadata {
    pub request_id: String,
    pub action: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RestEnvelope {
    pub response_metadata: ResponseMetadata,
    pub result: Value,
}

/// REST reply ready to be written.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: StatusCode,
    pub envelope: RestEnvelope,
}

impl IntoResponse for RestResponse {
    fn into_response(self) -> Response {
        let request_id = self.envelope.response_metadata.request_id.clone();
        let mut response = (self.status, Json(self.envelope)).into_response();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Rest,
    ToolProtocol,
}

#[derive(Debug, Clone)]
pub enum Rendered {
    Rest(RestResponse),
    ToolProtocol(CallToolResult),
}

pub fn format(result: &DispatchResult, ctx: &RequestContext, action: &str, transport: Transport) -> Rendered {
    match transport {
        Transport::Rest => Rendered::Rest(rest(result, ctx, action)),
        Transport::ToolProtocol => Rendered::ToolProtocol(tool_result(result)),
    }
}

pub fn rest(result: &DispatchResult, ctx: &RequestContext, action: &str) -> RestResponse {
    let (status, payload) = match result {
        Ok(output) => (StatusCode::OK, rest_payload(output)),
        Err(err) => (err.kind().status(), failure_payload(err)),
    };
    RestResponse {
        status,
        envelope: RestEnvelope {
            response_metadata: metadata(ctx, action),
            result: payload,
        },
    }
}

/// Envelope for failures raised before dispatch, such as authentication.
pub fn rest_error(ctx: &RequestContext, action: &str, status: StatusCode, message: &str) -> RestResponse {
    RestResponse {
        status,
        envelope: RestEnvelope {
            response_metadata: metadata(ctx, action),
            result: json!({ "error": message }),
        },
    }
}

fn metadata(ctx: &RequestContext, action: &str) -> ResponseMetadata {
    ResponseMetadata {
        request_id: ctx.request_id().to_string(),
        action: action.to_string(),
        version: VERSION.to_string(),
    }
}

fn rest_payload(output: &ActionOutput) -> Value {
    match output {
        ActionOutput::Done => json!({ "output": SUCCESS_OUTPUT }),
        ActionOutput::Cursor(c) => json!({ "PositionX": c.x, "PositionY": c.y }),
        ActionOutput::ScreenSize(s) => json!({ "Width": s.width, "Height": s.height }),
        ActionOutput::Screenshot { image, size } => json!({
            "Screenshot": image.data,
            "MimeType": image.mime_type,
            "Width": size.width,
            "Height": size.height,
        }),
    }
}

fn failure_payload(err: &DispatchError) -> Value {
    let mut payload = json!({
        "error": err.to_string(),
        "code": err.kind().as_str(),
    });
    let details: Vec<Value> = err
        .details()
        .iter()
        .map(|d| json!({ "field": d.field, "code": d.code, "message": d.message }))
        .collect();
    if !details.is_empty() {
        payload["details"] = Value::Array(details);
    }
    payload
}

pub fn tool_result(result: &DispatchResult) -> CallToolResult {
    match result {
        Ok(ActionOutput::Done) => CallToolResult::success(vec![Content::text(SUCCESS_OUTPUT)]),
        Ok(ActionOutput::Cursor(c)) => {
            CallToolResult::success(vec![Content::text(json!({ "x": c.x, "y": c.y }).to_string())])
        }
        Ok(ActionOutput::ScreenSize(s)) => CallToolResult::success(vec![Content::text(
            json!({ "width": s.width, "height": s.height }).to_string(),
        )]),
        Ok(ActionOutput::Screenshot { image, size }) => CallToolResult::success(vec![
            Content::text(json!({ "width": size.width, "height": size.height }).to_string()),
            Content::image(image.data.clone(), image.mime_type.clone()),
        ]),
        Err(err) => tool_error(&err.to_string()),
    }
}

pub fn tool_error(message: &str) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("Error: {message}"))])
}
