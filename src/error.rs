//! Error types for the docling-gateway library.
//!
//! A single enum, [`GatewayError`], covers every failure a request can hit.
//! Its variants fall into three classes (see [`ErrorClass`]):
//!
//! * **Input**: the caller sent something we cannot turn into a conversion
//!   request (no source, bad base64, malformed body). Always HTTP 400.
//! * **Conversion**: the backend could not produce markdown. HTTP 500, or
//!   400 when the backend blamed the document itself.
//! * **Internal**: configuration or archive assembly broke. HTTP 500.
//!
//! Every variant maps to a stable `error_type` string that ends up in the
//! JSON error body next to the human-readable message.

use thiserror::Error;

/// Coarse classification of a [`GatewayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller-supplied data is missing or invalid.
    Input,
    /// The external converter failed to produce output.
    Conversion,
    /// Anything else: configuration, archive assembly, bugs.
    Internal,
}

/// All errors produced while handling a conversion request.
#[derive(Debug, Error)]
pub enum GatewayError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Neither `source_url` nor `document` carried a value.
    #[error("missing source_url or document")]
    MissingSource,

    /// `document` is not valid base64.
    #[error("invalid base64 in 'document': {detail}")]
    InvalidBase64 { detail: String },

    /// The request body is not a JSON object of the expected shape.
    #[error("invalid request body: {detail}")]
    InvalidBody { detail: String },

    /// `source_url` is not an http(s) URL.
    #[error("invalid source_url '{url}': expected an http:// or https:// URL")]
    InvalidSourceUrl { url: String },

    /// The request body exceeds the configured size limit.
    #[error("request body exceeds the {limit}-byte limit")]
    BodyTooLarge { limit: usize },

    /// A conversion option is out of range.
    #[error("invalid value for '{field}': {detail}")]
    InvalidOption { field: &'static str, detail: String },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The converter ran and reported a failure.
    #[error("{message}")]
    Conversion {
        /// Failure class reported by the converter, surfaced as `error_type`.
        kind: String,
        message: String,
        /// The converter rejected the document itself (unsupported format,
        /// unreadable file) rather than failing on its own.
        caller_caused: bool,
    },

    /// The converter could not be reached.
    #[error("conversion backend at '{url}' is unreachable: {detail}")]
    BackendUnavailable { url: String, detail: String },

    /// The converter did not answer within the configured timeout.
    #[error("conversion backend did not respond within {secs}s")]
    BackendTimeout { secs: u64 },

    /// The converter answered with something we could not parse.
    #[error("conversion backend returned an unexpected response: {detail}")]
    InvalidBackendResponse { detail: String },

    // ── Internal errors ───────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Writing the export zip failed.
    #[error("failed to build export archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Which side of the contract this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            GatewayError::MissingSource
            | GatewayError::InvalidBase64 { .. }
            | GatewayError::InvalidBody { .. }
            | GatewayError::BodyTooLarge { .. }
            | GatewayError::InvalidSourceUrl { .. }
            | GatewayError::InvalidOption { .. } => ErrorClass::Input,
            GatewayError::Conversion { .. }
            | GatewayError::BackendUnavailable { .. }
            | GatewayError::BackendTimeout { .. }
            | GatewayError::InvalidBackendResponse { .. } => ErrorClass::Conversion,
            GatewayError::InvalidConfig(_)
            | GatewayError::Archive(_)
            | GatewayError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Whether the caller is to blame (drives 400 vs. 500).
    pub fn is_caller_caused(&self) -> bool {
        match self {
            GatewayError::Conversion { caller_caused, .. } => *caller_caused,
            other => other.class() == ErrorClass::Input,
        }
    }

    /// HTTP status code for the error response.
    pub fn status_code(&self) -> u16 {
        if matches!(self, GatewayError::BodyTooLarge { .. }) {
            413
        } else if self.is_caller_caused() {
            400
        } else {
            500
        }
    }

    /// The `error_type` field of the JSON error body.
    pub fn error_type(&self) -> &str {
        match self {
            GatewayError::InvalidBase64 { .. } => "Base64DecodeError",
            GatewayError::BodyTooLarge { .. } => "PayloadTooLarge",
            GatewayError::MissingSource
            | GatewayError::InvalidBody { .. }
            | GatewayError::InvalidSourceUrl { .. }
            | GatewayError::InvalidOption { .. } => "InputError",
            GatewayError::Conversion { kind, .. } => kind,
            GatewayError::BackendUnavailable { .. } => "ConnectionError",
            GatewayError::BackendTimeout { .. } => "TimeoutError",
            GatewayError::InvalidBackendResponse { .. } => "InvalidBackendResponse",
            GatewayError::InvalidConfig(_) => "ConfigError",
            GatewayError::Archive(_) | GatewayError::Internal(_) => "InternalError",
        }
    }
}
