//! Hosting envelopes.
//!
//! Each submodule is a thin adapter between one provider's invocation format
//! and the canonical [`crate::gateway::GatewayRequest`] /
//! [`crate::gateway::GatewayResponse`] pair:
//!
//! * [`proxy`]: API Gateway / Function URL / direct Lambda invocation events
//!   (`{statusCode, headers, body, isBase64Encoded}` responses).
//! * [`http`]: a plain axum router, `POST /convert` (feature `server`).

#[cfg(feature = "server")]
pub mod http;
pub mod proxy;

use crate::config::GatewayConfig;
use serde_json::{json, Value};

/// Body of a health-check response.
pub fn health_body(config: &GatewayConfig) -> Value {
    json!({
        "status": "healthy",
        "service": config.service_name,
    })
}
