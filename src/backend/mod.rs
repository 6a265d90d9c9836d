//! Conversion backends.
//!
//! The gateway never parses documents itself. A [`ConversionBackend`] takes a
//! resolved [`ConversionRequest`] and hands it to an external converter; the
//! production implementation is [`docling::DoclingServeBackend`], which talks
//! to a docling-serve instance over HTTP. Tests plug in their own backends.

pub mod docling;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::model::ConversionRequest;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::sync::Arc;

pub use docling::DoclingServeBackend;

/// How embedded pictures should appear in the converter's markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageExport {
    /// A placeholder comment where each picture was.
    Placeholder,
    /// Pictures inlined as base64 data URIs.
    Embedded,
}

/// Raw converter output, before export-mode image extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendOutput {
    pub markdown: String,
    /// Number of pages the converter saw (0 if it did not say).
    pub page_count: usize,
}

/// An external document-to-markdown converter.
#[async_trait]
pub trait ConversionBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Convert one document. Called exactly once per request; no retries.
    async fn convert(
        &self,
        request: &ConversionRequest,
        images: ImageExport,
    ) -> Result<BackendOutput, GatewayError>;
}

static SHARED_BACKEND: OnceCell<Arc<dyn ConversionBackend>> = OnceCell::new();

/// The process-wide backend, created from `config` on first use.
///
/// Warm serverless runtimes reuse it (and its connection pool) across
/// invocations. Later calls ignore `config`.
pub fn shared_backend(config: &GatewayConfig) -> Result<Arc<dyn ConversionBackend>, GatewayError> {
    SHARED_BACKEND
        .get_or_try_init(|| {
            let backend = DoclingServeBackend::new(config)?;
            Ok(Arc::new(backend) as Arc<dyn ConversionBackend>)
        })
        .map(Arc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_backend_is_initialised_once() {
        let config = GatewayConfig::default();
        let a = shared_backend(&config).expect("default config builds a backend");
        let other = GatewayConfig::builder()
            .docling_url("http://elsewhere:5001")
            .build()
            .unwrap();
        let b = shared_backend(&other).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.name(), "docling-serve");
    }
}
