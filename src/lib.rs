//! # docling-gateway
//!
//! Turn documents into Markdown through a [docling-serve] backend, hosted
//! either as a serverless function or as a plain HTTP service.
//!
//! ## Why this crate?
//!
//! Docling does the heavy lifting (layout analysis, table structure, OCR) but
//! ships as a large Python service. This crate is the small front door in
//! front of it: it accepts a document by URL or as inline base64, makes one
//! conversion call, and answers either with inline JSON or with a zip bundle
//! of the markdown plus its extracted images.
//!
//! ## Pipeline Overview
//!
//! ```text
//! provider event / HTTP request
//!  │
//!  ├─ envelope  proxy (Lambda, Function URL, OpenWhisk) or axum router
//!  ├─ 1. Input   JSON body → ConversionRequest (URL wins over inline bytes)
//!  ├─ 2. Invoke  one call to the ConversionBackend (docling-serve)
//!  ├─ 3. Images  export mode only: data-URI images → archive entries
//!  └─ 4. Shape   JSON body, zip attachment, or structured error
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docling_gateway::{handle_event, shared_backend, GatewayConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::builder()
//!         .docling_url("http://127.0.0.1:5001")
//!         .build()?;
//!     let backend = shared_backend(&config)?;
//!
//!     let event = json!({
//!         "httpMethod": "POST",
//!         "path": "/",
//!         "body": "{\"source_url\": \"https://arxiv.org/pdf/2408.09869\"}",
//!     });
//!     let response = handle_event(event, backend.as_ref(), &config).await;
//!     println!("{} {}", response.status_code, response.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `docling-gateway` binary (clap + anyhow + tracing-subscriber) |
//! | `server` | on      | axum router for `POST /convert` and the `serve` subcommand |
//! | `lambda` | off     | `lambda_runtime` host for the `lambda` subcommand |
//!
//! [docling-serve]: https://github.com/docling-project/docling-serve

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod convert;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod model;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{shared_backend, BackendOutput, ConversionBackend, DoclingServeBackend, ImageExport};
pub use config::{GatewayConfig, GatewayConfigBuilder};
pub use convert::{convert, handle};
pub use envelope::proxy::{handle_event, ProxyResponse};
pub use error::{ErrorClass, GatewayError};
pub use gateway::{GatewayRequest, GatewayResponse, ResponseBody};
pub use model::{
    ConversionOptions, ConversionRequest, ConversionResult, DocumentSource, ExtractedImage,
    ResponseMode,
};

#[cfg(feature = "server")]
pub use envelope::http::{router, AppState};
