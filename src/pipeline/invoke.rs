//! Conversion invocation: one backend call per request.

use crate::backend::{ConversionBackend, ImageExport};
use crate::error::GatewayError;
use crate::model::{ConversionRequest, ConversionResult, ResponseMode};
use crate::pipeline::images;
use std::time::Instant;
use tracing::info;

/// Run the backend once and collect a [`ConversionResult`].
///
/// In export mode the backend is asked for embedded images, which are then
/// lifted out of the markdown into separate files.
pub async fn invoke(
    backend: &dyn ConversionBackend,
    request: &ConversionRequest,
    mode: ResponseMode,
) -> Result<ConversionResult, GatewayError> {
    let start = Instant::now();
    let source_label = request.source_label().to_string();
    info!(
        "Converting '{}' via {} ({:?} mode)",
        source_label,
        backend.name(),
        mode
    );

    let export = if mode.wants_images() {
        ImageExport::Embedded
    } else {
        ImageExport::Placeholder
    };
    let output = backend.convert(request, export).await?;

    let (markdown, images) = if mode.wants_images() {
        images::extract_embedded_images(&output.markdown)
    } else {
        (output.markdown, Vec::new())
    };

    info!(
        "Converted '{}': {} pages, {} chars, {} images in {}ms",
        source_label,
        output.page_count,
        markdown.len(),
        images.len(),
        start.elapsed().as_millis()
    );

    Ok(ConversionResult {
        markdown,
        page_count: output.page_count,
        source_label,
        images,
    })
}
