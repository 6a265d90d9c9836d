//! Proxy-style envelope (AWS Lambda, DigitalOcean Functions).
//!
//! Accepted event shapes:
//!
//! * **REST API proxy**: `httpMethod`, `path`, `body` (JSON string,
//!   optionally base64 with `isBase64Encoded: true`).
//! * **HTTP API v2 / Function URL**: `requestContext.http.method`, `rawPath`.
//! * **DigitalOcean web function**: `__ow_method`, `__ow_path`, request
//!   fields flattened into the event.
//! * **Direct invocation**: no `body` key; the event itself is the payload.
//!
//! Binary bodies (export mode) are base64-encoded with `isBase64Encoded: true`,
//! which API Gateway turns back into raw bytes for the client.

use crate::backend::ConversionBackend;
use crate::config::GatewayConfig;
use crate::convert;
use crate::envelope::health_body;
use crate::error::GatewayError;
use crate::gateway::{GatewayRequest, GatewayResponse, ResponseBody};
use crate::model::ResponseMode;
use crate::pipeline::shape;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Proxy-integration response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl From<GatewayResponse> for ProxyResponse {
    fn from(response: GatewayResponse) -> Self {
        let headers = response
            .headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let (body, is_base64_encoded) = match response.body {
            ResponseBody::Json(value) => (value.to_string(), false),
            ResponseBody::Binary(bytes) => (STANDARD.encode(bytes), true),
        };
        Self {
            status_code: response.status,
            headers,
            body,
            is_base64_encoded,
        }
    }
}

/// Handle one proxy-style event.
pub async fn handle_event(
    event: Value,
    backend: &dyn ConversionBackend,
    config: &GatewayConfig,
) -> ProxyResponse {
    let method = event_method(&event).map(str::to_ascii_uppercase);
    let path = event_path(&event).to_string();
    debug!("Proxy event: {:?} {}", method, path);

    match method.as_deref() {
        Some("OPTIONS") => return shape::json_response(200, json!({"message": "OK"})).into(),
        Some("GET") if path == "/" => {
            return shape::json_response(200, health_body(config)).into();
        }
        _ => {}
    }

    let mode = ResponseMode::from_path(&path);
    let payload = match extract_payload(event) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Rejected event: {}", e);
            return shape::error_response(&e).into();
        }
    };

    convert::handle(GatewayRequest::new(mode, payload), backend)
        .await
        .into()
}

/// HTTP method from any supported event shape.
fn event_method(event: &Value) -> Option<&str> {
    event
        .get("httpMethod")
        .or_else(|| event.pointer("/requestContext/http/method"))
        .or_else(|| event.get("__ow_method"))
        .and_then(Value::as_str)
}

/// Request path from any supported event shape; `/` when absent or empty.
///
/// OpenWhisk reports the action root as `__ow_path: ""`.
fn event_path(event: &Value) -> &str {
    event
        .get("path")
        .or_else(|| event.get("rawPath"))
        .or_else(|| event.get("__ow_path"))
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .unwrap_or("/")
}

/// Unwrap the request body from the event.
pub fn extract_payload(mut event: Value) -> Result<Value, GatewayError> {
    let is_base64 = event
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let body = match event.as_object_mut().and_then(|o| o.remove("body")) {
        Some(body) => body,
        None => return Ok(event),
    };

    match body {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::String(text) => parse_body_text(&text, is_base64),
        other => Ok(other),
    }
}

fn parse_body_text(text: &str, is_base64: bool) -> Result<Value, GatewayError> {
    let decoded;
    let text = if is_base64 {
        let bytes = STANDARD
            .decode(text.trim())
            .map_err(|e| GatewayError::InvalidBody {
                detail: format!("body is marked base64 but does not decode: {e}"),
            })?;
        decoded = String::from_utf8(bytes).map_err(|e| GatewayError::InvalidBody {
            detail: format!("body is not UTF-8: {e}"),
        })?;
        decoded.as_str()
    } else {
        text
    };

    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(text).map_err(|e| GatewayError::InvalidBody {
        detail: format!("body is not valid JSON: {e}"),
    })
}
