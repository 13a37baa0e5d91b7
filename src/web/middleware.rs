//! Request-id and API-key middleware.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::warn;

use crate::config::AuthConfig;
use crate::context::{RequestContext, REQUEST_ID_HEADER};
use crate::envelope;

/// Paths reachable without an API key.
pub const AUTH_EXCLUDED_PATHS: &[&str] = &["/health", "/"];

/// Opens a [`RequestContext`] for the request, makes it available as a
/// request extension and as the task-local current context, and echoes the
/// request id on the response.
pub async fn request_id_middleware(mut req: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::from_headers(req.headers());
    let request_id = ctx.request_id().to_string();
    req.extensions_mut().insert(ctx.clone());

    let mut response = ctx.scope(next.run(req)).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Rejects requests without the configured API key. Shared by the REST
/// server and the HTTP tool-protocol transport.
pub async fn api_key_middleware(
    State(auth): State<Arc<AuthConfig>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !auth.api_key_enabled || AUTH_EXCLUDED_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }

    let ctx = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(|| RequestContext::from_headers(req.headers()));

    if auth.api_key.is_empty() {
        warn!("API key auth is enabled but no key is configured");
        return envelope::rest_error(&ctx, "auth", StatusCode::INTERNAL_SERVER_ERROR, "API key not configured")
            .into_response();
    }

    match ctx.credential() {
        None => {
            warn!("Rejected {}: missing API key", req.uri().path());
            let mut response =
                envelope::rest_error(&ctx, "auth", StatusCode::UNAUTHORIZED, "API key required").into_response();
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("ApiKey"));
            response
        }
        Some(key) if !key.matches(&auth.api_key) => {
            warn!("Rejected {}: invalid API key {}", req.uri().path(), key);
            envelope::rest_error(&ctx, "auth", StatusCode::FORBIDDEN, "Invalid API key").into_response()
        }
        Some(_) => next.run(req).await,
    }
}
