//! The canonical request/response pair every hosting envelope translates to
//! and from.
//!
//! Envelope adapters ([`crate::envelope`]) only ever build a
//! [`GatewayRequest`] and consume a [`GatewayResponse`]; nothing downstream
//! knows whether the call arrived through API Gateway or plain HTTP.

use crate::model::ResponseMode;
use serde_json::Value;

/// An envelope-free conversion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub mode: ResponseMode,
    /// The JSON request body (`source_url`, `document`, ...).
    pub payload: Value,
}

impl GatewayRequest {
    pub fn new(mode: ResponseMode, payload: Value) -> Self {
        Self { mode, payload }
    }
}

/// Response body: JSON for markdown mode and errors, bytes for export mode.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Binary(Vec<u8>),
}

/// An envelope-free response.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    /// Header name/value pairs in insertion order.
    pub headers: Vec<(&'static str, String)>,
    pub body: ResponseBody,
}

impl GatewayResponse {
    /// Look up a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The JSON body, if this is a JSON response.
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Binary(_) => None,
        }
    }
}
