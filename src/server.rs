use crate::bridge::Bridge;
use crate::error::BridgeError;
use crate::logging::{LogStage, SharedLogger};
use crate::transport::ChatTransport;
use crate::translate::anthropic_types::{ErrorResponse, MessagesRequest};
use crate::translate::response::upstream_error_to_anthropic;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub bridge: Bridge<Arc<dyn ChatTransport>>,
    pub logger: SharedLogger,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/messages", post(handle_messages))
        .route("/health", get(handle_health))
        .route("/v1/logs", get(handle_logs))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_messages(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req = match MessagesRequest::from_json_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            state
                .logger
                .warn(LogStage::Server, format!("Failed to parse request: {e}"));
            return error_response(&e);
        }
    };

    if req.stream.unwrap_or(false) {
        let err = ErrorResponse::invalid_request("Streaming responses are not supported");
        return (StatusCode::BAD_REQUEST, Json(err)).into_response();
    }

    match state.bridge.send_message(&req).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Map a bridge failure onto a Messages API error envelope and status.
pub fn error_response(err: &BridgeError) -> Response {
    let (status, body) = match err {
        BridgeError::Validation { message } => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::invalid_request(message.clone()),
        ),
        BridgeError::Upstream { status, body } => (
            StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            upstream_error_to_anthropic(*status, body),
        ),
        other => (
            StatusCode::BAD_GATEWAY,
            ErrorResponse::api_error(other.to_string()),
        ),
    };
    (status, Json(body)).into_response()
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

async fn handle_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> Json<serde_json::Value> {
    let entries = state.logger.recent(query.limit.unwrap_or(100));
    Json(serde_json::json!({ "data": entries }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let resp = error_response(&BridgeError::validation("missing required field `max_tokens`"));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = error_response(&BridgeError::conversion("unrecognised finish_reason"));
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let resp = error_response(&BridgeError::upstream(429, "{}"));
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        // Error envelopes delivered with a 200 are still failures
        let resp = error_response(&BridgeError::upstream(200, r#"{"error":{"message":"x"}}"#));
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
