//! Response shaping: turn a conversion outcome into a [`GatewayResponse`].
//!
//! ## Bodies
//!
//! | Outcome        | Status  | Content-Type       | Body |
//! |----------------|---------|--------------------|------|
//! | markdown mode  | 200     | `application/json` | `{success, markdown, metadata{num_pages, source}}` |
//! | export mode    | 200     | `application/zip`  | flat zip: `<stem>.md` + images |
//! | any error      | 400/500 | `application/json` | `{success: false, error, error_type}` |
//!
//! Every response carries the same permissive CORS headers.

use crate::error::GatewayError;
use crate::gateway::{GatewayResponse, ResponseBody};
use crate::model::ConversionResult;
use crate::pipeline::input::{is_url, url_file_name};
use serde_json::{json, Value};
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Stem used when nothing usable can be derived from the source.
const FALLBACK_STEM: &str = "document";

/// CORS headers shared by every response.
fn base_headers(content_type: &str) -> Vec<(&'static str, String)> {
    vec![
        ("Content-Type", content_type.to_string()),
        ("Access-Control-Allow-Origin", "*".to_string()),
        ("Access-Control-Allow-Headers", "Content-Type".to_string()),
        ("Access-Control-Allow-Methods", "POST, OPTIONS".to_string()),
    ]
}

/// A JSON response with the standard headers.
pub fn json_response(status: u16, body: Value) -> GatewayResponse {
    GatewayResponse {
        status,
        headers: base_headers("application/json"),
        body: ResponseBody::Json(body),
    }
}

/// Markdown mode: inline JSON.
pub fn markdown_response(result: &ConversionResult) -> GatewayResponse {
    json_response(
        200,
        json!({
            "success": true,
            "markdown": result.markdown,
            "metadata": {
                "num_pages": result.page_count,
                "source": result.source_label,
            },
        }),
    )
}

/// Export mode: zip archive as an attachment.
pub fn export_response(result: &ConversionResult) -> Result<GatewayResponse, GatewayError> {
    let stem = archive_stem(&result.source_label);
    let archive = build_archive(result, &stem)?;
    debug!(
        "Built {}.zip: {} bytes, {} images",
        stem,
        archive.len(),
        result.images.len()
    );

    let mut headers = base_headers("application/zip");
    headers.push((
        "Content-Disposition",
        format!("attachment; filename=\"{stem}.zip\""),
    ));

    Ok(GatewayResponse {
        status: 200,
        headers,
        body: ResponseBody::Binary(archive),
    })
}

/// Structured error body.
pub fn error_response(err: &GatewayError) -> GatewayResponse {
    json_response(
        err.status_code(),
        json!({
            "success": false,
            "error": err.to_string(),
            "error_type": err.error_type(),
        }),
    )
}

/// Write `<stem>.md` followed by every image into a flat zip archive.
pub fn build_archive(result: &ConversionResult, stem: &str) -> Result<Vec<u8>, GatewayError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let text = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    // Image formats are already compressed.
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file(format!("{stem}.md"), text)?;
    zip.write_all(result.markdown.as_bytes())
        .map_err(|e| GatewayError::Internal(format!("zip write: {e}")))?;

    for image in &result.images {
        zip.start_file(image.name.as_str(), stored)?;
        zip.write_all(&image.data)
            .map_err(|e| GatewayError::Internal(format!("zip write: {e}")))?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Derive the archive/markdown base name from a URL or filename.
///
/// The last path component is used, a purely alphabetic extension is
/// dropped, and anything outside `[A-Za-z0-9._-]` becomes `_`.
pub fn archive_stem(source_label: &str) -> String {
    let name = if is_url(source_label) {
        url_file_name(source_label).unwrap_or_default()
    } else {
        source_label
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or_default()
            .to_string()
    };

    let base = match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            stem
        }
        _ => name.as_str(),
    };

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExtractedImage;
    use std::io::Read;

    fn result_with_images() -> ConversionResult {
        ConversionResult {
            markdown: "# Report\n\n![Image](image_000000_0123456789abcdef.png)\n".into(),
            page_count: 2,
            source_label: "quarterly report.pdf".into(),
            images: vec![ExtractedImage {
                name: "image_000000_0123456789abcdef.png".into(),
                data: b"\x89PNG fake".to_vec(),
            }],
        }
    }

    #[test]
    fn markdown_body_shape() {
        let resp = markdown_response(&result_with_images());
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("content-type"), Some("application/json"));
        assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("*"));

        let body = resp.json().unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["metadata"]["num_pages"], 2);
        assert_eq!(body["metadata"]["source"], "quarterly report.pdf");
        assert!(body["markdown"].as_str().unwrap().starts_with("# Report"));
    }

    #[test]
    fn export_is_a_zip_attachment() {
        let resp = export_response(&result_with_images()).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("Content-Type"), Some("application/zip"));
        assert_eq!(
            resp.header("Content-Disposition"),
            Some("attachment; filename=\"quarterly_report.zip\"")
        );
        match resp.body {
            ResponseBody::Binary(bytes) => assert!(bytes.starts_with(b"PK\x03\x04")),
            ResponseBody::Json(_) => panic!("expected binary body"),
        }
    }

    #[test]
    fn archive_is_flat_with_markdown_first() {
        let result = result_with_images();
        let bytes = build_archive(&result, "report").unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut md = String::new();
        archive
            .by_index(0)
            .unwrap()
            .read_to_string(&mut md)
            .unwrap();
        assert_eq!(md, result.markdown);
        assert_eq!(archive.by_index(0).unwrap().name(), "report.md");
        assert_eq!(
            archive.by_index(1).unwrap().name(),
            "image_000000_0123456789abcdef.png"
        );
    }

    #[test]
    fn error_body_shape() {
        let resp = error_response(&GatewayError::MissingSource);
        assert_eq!(resp.status, 400);
        let body = resp.json().unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "missing source_url or document");
        assert_eq!(body["error_type"], "InputError");
    }

    #[test]
    fn stems() {
        assert_eq!(archive_stem("document.pdf"), "document");
        assert_eq!(archive_stem("my report (v2).docx"), "my_report__v2_");
        assert_eq!(archive_stem("https://arxiv.org/pdf/2408.09869"), "2408.09869");
        assert_eq!(archive_stem("https://example.com/files/paper.pdf?x=1"), "paper");
        assert_eq!(archive_stem("https://example.com/"), "document");
        assert_eq!(archive_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(archive_stem(".pdf"), "pdf");
        assert_eq!(archive_stem(""), "document");
        assert_eq!(archive_stem("C:\\scans\\invoice.pdf"), "invoice");
    }
}
