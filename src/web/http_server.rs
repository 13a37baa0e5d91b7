//! REST routes and server loop.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{Method, StatusCode, Uri},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use log::info;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use super::middleware::{api_key_middleware, request_id_middleware};
use super::AppState;
use crate::action::naming::to_canonical;
use crate::context::RequestContext;
use crate::envelope::{self, RestResponse, VERSION};
use crate::error::DispatchError;

pub const SERVICE_NAME: &str = "computer-use-mcp";

pub fn router(state: Arc<AppState>) -> Router {
    let base = format!("{}/computer", state.config.server.api_prefix);
    let auth = Arc::new(state.config.auth.clone());

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route(&format!("{base}/actions"), get(actions_handler))
        .route(&format!("{base}/{{action}}"), post(action_handler))
        .method_not_allowed_fallback(method_not_allowed_handler)
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(auth, api_key_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the REST tool server
pub async fn run_http_server(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = router(state.clone());

    let listener = TcpListener::bind(&addr).await?;
    info!(
        "REST tool server listening on http://{}{}/computer",
        addr, state.config.server.api_prefix
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)?;

    Ok(())
}

pub(crate) async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

async fn root_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": VERSION,
        "api_prefix": state.config.server.api_prefix,
    }))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.uptime().as_secs(),
        "version": VERSION,
    }))
}

async fn actions_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let actions: Vec<Value> = state
        .dispatcher
        .registry()
        .actions()
        .iter()
        .map(|a| {
            json!({
                "name": a.wire_name(),
                "canonical_name": a.name,
                "description": a.description,
                "input_schema": Value::Object(a.input_schema()),
            })
        })
        .collect();
    Json(json!({ "count": actions.len(), "actions": actions }))
}

async fn action_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(action): Path<String>,
    body: Bytes,
) -> RestResponse {
    let canonical = to_canonical(action.trim());
    let params = match parse_params(&body) {
        Ok(params) => params,
        Err(err) => return envelope::rest(&Err(err), &ctx, &canonical),
    };

    let result = state
        .dispatcher
        .dispatch(state.computer.as_ref(), &ctx, &action, &params)
        .await;
    envelope::rest(&result, &ctx, &canonical)
}

async fn method_not_allowed_handler(
    Extension(ctx): Extension<RequestContext>,
    method: Method,
    uri: Uri,
) -> RestResponse {
    envelope::rest_error(
        &ctx,
        &route_action(&uri),
        StatusCode::METHOD_NOT_ALLOWED,
        &format!("Method {method} not allowed for {}", uri.path()),
    )
}

async fn not_found_handler(Extension(ctx): Extension<RequestContext>, uri: Uri) -> RestResponse {
    envelope::rest_error(
        &ctx,
        &route_action(&uri),
        StatusCode::NOT_FOUND,
        &format!("No route for {}", uri.path()),
    )
}

/// Canonical form of the last path segment, for unrouted requests.
fn route_action(uri: &Uri) -> String {
    uri.path()
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(to_canonical)
        .unwrap_or_default()
}

/// An empty body is an empty parameter map.
fn parse_params(body: &[u8]) -> Result<Map<String, Value>, DispatchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err(DispatchError::invalid("request body must be a JSON object")),
        Err(e) => Err(DispatchError::invalid(format!("malformed JSON body: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computer::fake::FakeComputer;
    use crate::config::Config;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::response::Response;
    use tower::ServiceExt;

    fn app_with(config: Config, computer: Arc<FakeComputer>) -> Router {
        router(Arc::new(AppState::new(Arc::new(config), computer)))
    }

    fn app() -> (Router, Arc<FakeComputer>) {
        let computer = Arc::new(FakeComputer::default());
        (app_with(Config::default(), computer.clone()), computer)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-request-id", "rid-123")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn action_envelope_echoes_request_id() {
        let (app, computer) = app();
        let response = app
            .oneshot(post_json("/api/computer/MoveMouse", json!({"PositionX": 10, "PositionY": 20})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "rid-123");
        let body = json_body(response).await;
        assert_eq!(body["ResponseMetadata"]["RequestId"], "rid-123");
        assert_eq!(body["ResponseMetadata"]["Action"], "move_mouse");
        assert_eq!(body["ResponseMetadata"]["Version"], VERSION);
        assert_eq!(body["Result"]["output"], "Operation successful");
        assert_eq!(computer.calls(), vec!["move_mouse(10,20)"]);
    }

    #[tokio::test]
    async fn request_id_is_generated_when_absent() {
        let (app, _) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/computer/GetCursorPosition")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let header = response.headers()["x-request-id"].to_str().unwrap().to_string();
        let body = json_body(response).await;
        assert_eq!(body["ResponseMetadata"]["RequestId"], header.as_str());
        assert_eq!(body["Result"], json!({"PositionX": 12, "PositionY": 34}));
    }

    #[tokio::test]
    async fn unknown_action_is_404_envelope() {
        let (app, _) = app();
        let response = app.oneshot(post_json("/api/computer/Fly", json!({}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["ResponseMetadata"]["RequestId"], "rid-123");
        assert_eq!(body["Result"]["code"], "action_not_found");
    }

    #[tokio::test]
    async fn invalid_params_are_400_with_details() {
        let (app, _) = app();
        let response = app
            .oneshot(post_json("/api/computer/Scroll", json!({"Direction": "sideways"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["Result"]["details"][0]["field"], "scroll_direction");
        assert_eq!(body["Result"]["details"][0]["code"], "invalid_enum");
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let (app, _) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/computer/TypeText")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["Result"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn screenshot_failure_reports_handler_error() {
        let computer = Arc::new(FakeComputer {
            size: Err(crate::error::ComputerError::device("no display")),
            ..Default::default()
        });
        let app = app_with(Config::default(), computer);
        let response = app
            .oneshot(post_json("/api/computer/TakeScreenshot", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["Result"]["error"], "no display");
    }

    #[tokio::test]
    async fn actions_listing_covers_registry() {
        let (app, _) = app();
        let request = Request::builder().uri("/api/computer/actions").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["count"], 12);
        assert_eq!(body["actions"][0]["name"], "MoveMouse");
    }

    #[tokio::test]
    async fn wrong_method_is_405_envelope() {
        let (app, computer) = app();
        let response = app
            .clone()
            .oneshot(post_json("/api/computer/actions", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["x-request-id"], "rid-123");
        let body = json_body(response).await;
        assert_eq!(body["ResponseMetadata"]["RequestId"], "rid-123");
        assert_eq!(body["ResponseMetadata"]["Action"], "actions");
        assert!(body["Result"]["error"].as_str().unwrap().contains("POST"));

        let request = Request::builder()
            .uri("/api/computer/MoveMouse")
            .header("x-request-id", "rid-456")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = json_body(response).await;
        assert_eq!(body["ResponseMetadata"]["RequestId"], "rid-456");
        assert_eq!(body["ResponseMetadata"]["Action"], "move_mouse");
        assert!(computer.calls().is_empty());
    }

    #[tokio::test]
    async fn unrouted_path_is_404_envelope() {
        let (app, _) = app();
        let request = Request::builder().uri("/api/other/Thing").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let header = response.headers()["x-request-id"].to_str().unwrap().to_string();
        let body = json_body(response).await;
        assert_eq!(body["ResponseMetadata"]["RequestId"], header.as_str());
        assert_eq!(body["Result"]["error"], "No route for /api/other/Thing");
    }

    fn auth_config() -> Config {
        let mut config = Config::default();
        config.auth.api_key_enabled = true;
        config.auth.api_key = "secret-key-123".into();
        config
    }

    #[tokio::test]
    async fn missing_api_key_is_401() {
        let app = app_with(auth_config(), Arc::new(FakeComputer::default()));
        let response = app.oneshot(post_json("/api/computer/Wait", json!({"Duration": 0}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["www-authenticate"], "ApiKey");
        assert_eq!(response.headers()["x-request-id"], "rid-123");
        let body = json_body(response).await;
        assert_eq!(body["ResponseMetadata"]["Action"], "auth");
    }

    #[tokio::test]
    async fn wrong_api_key_is_403_and_right_key_passes() {
        let app = app_with(auth_config(), Arc::new(FakeComputer::default()));
        let mut request = post_json("/api/computer/GetScreenSize", json!({}));
        request.headers_mut().insert("x-api-key", "nope".parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let mut request = post_json("/api/computer/GetScreenSize", json!({}));
        request
            .headers_mut()
            .insert("authorization", "Bearer secret-key-123".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["Result"], json!({"Width": 1280, "Height": 720}));
    }

    #[tokio::test]
    async fn health_skips_auth() {
        let app = app_with(auth_config(), Arc::new(FakeComputer::default()));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[test]
    fn empty_and_null_bodies_are_empty_params() {
        assert!(parse_params(b"").unwrap().is_empty());
        assert!(parse_params(b"  \n").unwrap().is_empty());
        assert!(parse_params(b"null").unwrap().is_empty());
        assert!(parse_params(b"[1]").is_err());
    }
}
