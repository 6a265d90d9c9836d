//! Gateway configuration.
//!
//! Everything the gateway needs to reach its conversion backend lives in
//! [`GatewayConfig`], built through [`GatewayConfigBuilder`]. Per-request
//! knobs (`filename`, `image_resolution_scale`, ...) are not here; they come
//! from the request body.

use crate::error::GatewayError;
use crate::pipeline::input::is_url;
use std::fmt;

/// Default docling-serve address (the port its container listens on).
pub const DEFAULT_DOCLING_URL: &str = "http://127.0.0.1:5001";

/// Largest request body the HTTP envelope buffers (32 MiB).
///
/// Inline documents travel base64-encoded, so this admits documents of
/// roughly 24 MiB; Lambda's own 6 MB payload cap is well inside it.
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Service name reported by the health endpoints.
pub const DEFAULT_SERVICE_NAME: &str = "docling-converter";

/// Configuration for the gateway and its docling-serve backend.
///
/// # Example
/// ```rust
/// use docling_gateway::GatewayConfig;
///
/// let config = GatewayConfig::builder()
///     .docling_url("http://docling:5001")
///     .request_timeout_secs(120)
///     .build()
///     .unwrap();
/// assert_eq!(config.docling_url, "http://docling:5001");
/// ```
#[derive(Clone)]
pub struct GatewayConfig {
    /// Base URL of the docling-serve instance. Default: `http://127.0.0.1:5001`.
    pub docling_url: String,

    /// Value for the `X-Api-Key` header, when docling-serve is protected.
    pub api_key: Option<String>,

    /// Timeout for one backend call, in seconds. Default: 300.
    ///
    /// Conversions of long scanned documents are slow; the hosting platform
    /// usually enforces its own hard limit on top of this.
    pub request_timeout_secs: u64,

    /// Run OCR on bitmap content. Default: false.
    pub do_ocr: bool,

    /// Name reported by health checks. Default: `docling-converter`.
    pub service_name: String,

    /// Request body limit for the HTTP envelope, in bytes. Default: 32 MiB.
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            docling_url: DEFAULT_DOCLING_URL.to_string(),
            api_key: None,
            request_timeout_secs: 300,
            do_ocr: false,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("docling_url", &self.docling_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("do_ocr", &self.do_ocr)
            .field("service_name", &self.service_name)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl GatewayConfig {
    /// Create a new builder for `GatewayConfig`.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    pub fn docling_url(mut self, url: impl Into<String>) -> Self {
        self.config.docling_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.api_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn do_ocr(mut self, v: bool) -> Self {
        self.config.do_ocr = v;
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.config.max_body_bytes = bytes;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GatewayConfig, GatewayError> {
        let c = &self.config;
        if !is_url(&c.docling_url) {
            return Err(GatewayError::InvalidConfig(format!(
                "docling URL must start with http:// or https://, got '{}'",
                c.docling_url
            )));
        }
        if c.request_timeout_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "request timeout must be at least 1 second".into(),
            ));
        }
        if c.max_body_bytes == 0 {
            return Err(GatewayError::InvalidConfig(
                "max body size must be at least 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}
