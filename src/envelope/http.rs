//! Direct HTTP envelope: an axum router for container-style hosting.
//!
//! | Route                 | Response |
//! |-----------------------|----------|
//! | `GET  /health`        | `{status, service, version}` |
//! | `POST /convert`       | markdown mode (JSON) |
//! | `POST /convert/full`  | export mode (raw zip bytes) |
//!
//! Preflight requests are answered by [`CorsLayer`]. Bodies are capped at
//! [`GatewayConfig::max_body_bytes`]; larger ones get a JSON 413.

use crate::backend::ConversionBackend;
use crate::config::GatewayConfig;
use crate::convert;
use crate::envelope::health_body;
use crate::error::GatewayError;
use crate::gateway::{GatewayRequest, GatewayResponse, ResponseBody};
use crate::model::ResponseMode;
use crate::pipeline::shape;
use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared router state.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn ConversionBackend>,
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    pub fn new(backend: Arc<dyn ConversionBackend>, config: GatewayConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/convert", post(convert_markdown))
        .route("/convert/full", post(convert_export))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let mut body = health_body(&state.config);
    body["version"] = Value::from(env!("CARGO_PKG_VERSION"));
    Json(body)
}

async fn convert_markdown(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    dispatch(&state, ResponseMode::Markdown, body).await
}

async fn convert_export(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    dispatch(&state, ResponseMode::Export, body).await
}

async fn dispatch(
    state: &AppState,
    mode: ResponseMode,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let parsed = body
        .map_err(|rejection| body_error(rejection, state.config.max_body_bytes))
        .and_then(|bytes| parse_body(&bytes));
    let response = match parsed {
        Ok(payload) => {
            convert::handle(GatewayRequest::new(mode, payload), state.backend.as_ref()).await
        }
        Err(e) => {
            warn!("Rejected request body: {}", e);
            shape::error_response(&e)
        }
    };
    into_http_response(response)
}

/// Turn an axum body rejection into the gateway's own error.
fn body_error(rejection: BytesRejection, limit: usize) -> GatewayError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::BodyTooLarge { limit }
    } else {
        GatewayError::InvalidBody {
            detail: rejection.body_text(),
        }
    }
}

/// An empty body is an empty request object.
fn parse_body(body: &[u8]) -> Result<Value, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| GatewayError::InvalidBody {
        detail: format!("body is not valid JSON: {e}"),
    })
}

/// Convert a canonical response into an axum response.
///
/// `access-control-*` headers are left to [`CorsLayer`] so they are not
/// emitted twice.
pub fn into_http_response(response: GatewayResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        if name.to_ascii_lowercase().starts_with("access-control-") {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("Dropping unrepresentable header {}", name),
        }
    }

    match response.body {
        ResponseBody::Json(value) => (status, headers, Json(value)).into_response(),
        ResponseBody::Binary(bytes) => (status, headers, Body::from(bytes)).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_empty_object() {
        assert_eq!(parse_body(b"").unwrap(), Value::Object(Map::new()));
        assert_eq!(parse_body(b" \n").unwrap(), Value::Object(Map::new()));
    }

    #[test]
    fn malformed_body_is_input_error() {
        let err = parse_body(b"{\"document\":").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_type(), "InputError");
    }

    #[test]
    fn cors_headers_are_left_to_the_layer() {
        let response = into_http_response(shape::json_response(200, serde_json::json!({})));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            HeaderValue::from_static("application/json")
        );
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
