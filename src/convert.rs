//! Request handling entry points.
//!
//! [`handle`] is what both hosting envelopes call: it runs
//! resolve → invoke → shape and never fails, turning every error into the
//! structured error body. [`convert`] stops after the invoke step and is
//! meant for callers that want the [`ConversionResult`] itself (the CLI).

use crate::backend::ConversionBackend;
use crate::error::{ErrorClass, GatewayError};
use crate::gateway::{GatewayRequest, GatewayResponse};
use crate::model::{ConversionRequest, ConversionResult, ResponseMode};
use crate::pipeline::{input, invoke, shape};
use tracing::{error, warn};

/// Handle one canonical request.
///
/// # Example
/// ```rust,no_run
/// use docling_gateway::{handle, shared_backend, GatewayConfig, GatewayRequest, ResponseMode};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = shared_backend(&GatewayConfig::default())?;
/// let request = GatewayRequest::new(
///     ResponseMode::Markdown,
///     json!({"source_url": "https://arxiv.org/pdf/2408.09869"}),
/// );
/// let response = handle(request, backend.as_ref()).await;
/// println!("{}", response.status);
/// # Ok(())
/// # }
/// ```
pub async fn handle(request: GatewayRequest, backend: &dyn ConversionBackend) -> GatewayResponse {
    match run(&request, backend).await {
        Ok(response) => response,
        Err(e) => {
            match e.class() {
                ErrorClass::Input => warn!("Rejected request: {}", e),
                _ if e.is_caller_caused() => warn!("Backend rejected document: {}", e),
                _ => error!("Conversion failed ({}): {}", e.error_type(), e),
            }
            shape::error_response(&e)
        }
    }
}

/// Convert an already-resolved request.
pub async fn convert(
    request: &ConversionRequest,
    mode: ResponseMode,
    backend: &dyn ConversionBackend,
) -> Result<ConversionResult, GatewayError> {
    invoke::invoke(backend, request, mode).await
}

async fn run(
    request: &GatewayRequest,
    backend: &dyn ConversionBackend,
) -> Result<GatewayResponse, GatewayError> {
    let conversion = input::resolve_request(&request.payload)?;
    let result = convert(&conversion, request.mode, backend).await?;
    match request.mode {
        ResponseMode::Markdown => Ok(shape::markdown_response(&result)),
        ResponseMode::Export => shape::export_response(&result),
    }
}
