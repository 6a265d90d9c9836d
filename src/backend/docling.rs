//! docling-serve backend.
//!
//! docling-serve wraps the Docling converter in a small HTTP API. We use its
//! synchronous `POST /v1/convert/source` endpoint: one JSON request in, one
//! converted document out. Remote documents are passed as `http` sources so
//! docling-serve downloads them itself; inline documents travel as `file`
//! sources with a base64 payload and the caller's filename as format hint.

use super::{BackendOutput, ConversionBackend, ImageExport};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::model::{ConversionRequest, DocumentSource};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const CONVERT_PATH: &str = "/v1/convert/source";

/// Client for a docling-serve instance.
#[derive(Debug, Clone)]
pub struct DoclingServeBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_secs: u64,
    do_ocr: bool,
}

impl DoclingServeBackend {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", config.docling_url, CONVERT_PATH),
            api_key: config.api_key.clone(),
            timeout_secs: config.request_timeout_secs,
            do_ocr: config.do_ocr,
        })
    }

    /// Full URL of the conversion endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ConversionBackend for DoclingServeBackend {
    fn name(&self) -> &str {
        "docling-serve"
    }

    async fn convert(
        &self,
        request: &ConversionRequest,
        images: ImageExport,
    ) -> Result<BackendOutput, GatewayError> {
        let body = build_request(request, images, self.do_ocr);
        debug!(
            "POST {} ({:?}, image_export_mode={})",
            self.endpoint, request.filename, body.options.image_export_mode
        );

        let mut call = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            call = call.header("X-Api-Key", key);
        }

        let response = call.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(http_error(status, &text));
        }

        let parsed: ConvertResponse =
            serde_json::from_str(&text).map_err(|e| GatewayError::InvalidBackendResponse {
                detail: e.to_string(),
            })?;
        into_output(parsed)
    }
}

impl DoclingServeBackend {
    fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::BackendTimeout {
                secs: self.timeout_secs,
            }
        } else {
            GatewayError::BackendUnavailable {
                url: self.endpoint.clone(),
                detail: e.to_string(),
            }
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ConvertRequest {
    options: ConvertOptions,
    sources: Vec<Source>,
}

#[derive(Debug, Serialize)]
struct ConvertOptions {
    to_formats: [&'static str; 2],
    image_export_mode: &'static str,
    do_ocr: bool,
    include_images: bool,
    images_scale: f64,
    generate_table_images: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Source {
    Http { url: String },
    File { base64_string: String, filename: String },
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    #[serde(default)]
    document: Option<ConvertedDocument>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ConvertedDocument {
    #[serde(default)]
    md_content: Option<String>,
    #[serde(default)]
    json_content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    module_name: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

fn build_request(request: &ConversionRequest, images: ImageExport, do_ocr: bool) -> ConvertRequest {
    let source = match &request.source {
        DocumentSource::Url(url) => Source::Http { url: url.clone() },
        DocumentSource::Bytes(bytes) => Source::File {
            base64_string: STANDARD.encode(bytes),
            filename: request.filename.clone(),
        },
    };

    ConvertRequest {
        options: ConvertOptions {
            to_formats: ["md", "json"],
            image_export_mode: match images {
                ImageExport::Placeholder => "placeholder",
                ImageExport::Embedded => "embedded",
            },
            do_ocr,
            include_images: images == ImageExport::Embedded,
            images_scale: request.options.image_resolution_scale,
            generate_table_images: request.options.extract_tables_as_images,
        },
        sources: vec![source],
    }
}

fn into_output(response: ConvertResponse) -> Result<BackendOutput, GatewayError> {
    match response.status.as_str() {
        "success" => {}
        "partial_success" => warn!(
            "docling-serve reported partial success ({} errors)",
            response.errors.len()
        ),
        other => return Err(failure_error(other, &response.errors)),
    }

    let document = response
        .document
        .ok_or_else(|| GatewayError::InvalidBackendResponse {
            detail: "response has no document".into(),
        })?;
    let markdown = document
        .md_content
        .ok_or_else(|| GatewayError::InvalidBackendResponse {
            detail: "document has no markdown content".into(),
        })?;
    let page_count = document.json_content.as_ref().map_or(0, count_pages);

    Ok(BackendOutput {
        markdown,
        page_count,
    })
}

/// Pages in a DoclingDocument: `pages` is a map keyed by page number.
fn count_pages(doc: &Value) -> usize {
    match doc.get("pages") {
        Some(Value::Object(pages)) => pages.len(),
        Some(Value::Array(pages)) => pages.len(),
        _ => 0,
    }
}

fn failure_error(status: &str, errors: &[ErrorItem]) -> GatewayError {
    let first = errors.first();
    let kind = first
        .and_then(|e| e.module_name.as_deref())
        .and_then(|m| m.rsplit('.').next())
        .filter(|k| !k.is_empty())
        .unwrap_or("ConversionError")
        .to_string();
    let message = first
        .and_then(|e| e.error_message.clone())
        .unwrap_or_else(|| format!("conversion finished with status '{status}'"));

    GatewayError::Conversion {
        kind,
        message,
        caller_caused: false,
    }
}

fn http_error(status: StatusCode, body: &str) -> GatewayError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").map(detail_text))
        .unwrap_or_else(|| body.trim().chars().take(500).collect());

    let caller_caused = status.is_client_error()
        && !matches!(
            status,
            StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::NOT_FOUND
                | StatusCode::TOO_MANY_REQUESTS
        );

    GatewayError::Conversion {
        kind: if caller_caused {
            "UnsupportedDocument".into()
        } else {
            "ConversionError".into()
        },
        message: format!("docling-serve returned HTTP {}: {}", status.as_u16(), detail),
        caller_caused,
    }
}

/// FastAPI puts either a string or a list of validation errors in `detail`.
fn detail_text(detail: &Value) -> String {
    match detail {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|i| i.get("msg").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConversionOptions, DEFAULT_FILENAME};
    use serde_json::json;

    fn inline_request() -> ConversionRequest {
        ConversionRequest {
            source: DocumentSource::Bytes(b"%PDF-1.4".to_vec()),
            filename: DEFAULT_FILENAME.into(),
            options: ConversionOptions::default(),
        }
    }

    #[test]
    fn builds_file_source_for_inline_bytes() {
        let body = serde_json::to_value(build_request(
            &inline_request(),
            ImageExport::Placeholder,
            false,
        ))
        .unwrap();

        assert_eq!(body["sources"][0]["kind"], "file");
        assert_eq!(body["sources"][0]["base64_string"], "JVBERi0xLjQ=");
        assert_eq!(body["sources"][0]["filename"], "document.pdf");
        assert_eq!(body["options"]["to_formats"], json!(["md", "json"]));
        assert_eq!(body["options"]["image_export_mode"], "placeholder");
        assert_eq!(body["options"]["include_images"], false);
        assert_eq!(body["options"]["do_ocr"], false);
        assert_eq!(body["options"]["images_scale"], 2.0);
    }

    #[test]
    fn builds_http_source_for_urls() {
        let mut request = inline_request();
        request.source = DocumentSource::Url("https://arxiv.org/pdf/2408.09869".into());
        request.options.extract_tables_as_images = true;
        request.options.image_resolution_scale = 3.0;

        let body =
            serde_json::to_value(build_request(&request, ImageExport::Embedded, true)).unwrap();
        assert_eq!(body["sources"][0]["kind"], "http");
        assert_eq!(body["sources"][0]["url"], "https://arxiv.org/pdf/2408.09869");
        assert_eq!(body["options"]["image_export_mode"], "embedded");
        assert_eq!(body["options"]["include_images"], true);
        assert_eq!(body["options"]["generate_table_images"], true);
        assert_eq!(body["options"]["images_scale"], 3.0);
        assert_eq!(body["options"]["do_ocr"], true);
    }

    #[test]
    fn parses_success_response() {
        let response: ConvertResponse = serde_json::from_value(json!({
            "document": {
                "filename": "document.pdf",
                "md_content": "# Docling Technical Report\n",
                "json_content": {"pages": {"1": {}, "2": {}, "3": {}}},
            },
            "status": "success",
            "errors": [],
            "processing_time": 1.7,
        }))
        .unwrap();

        let out = into_output(response).unwrap();
        assert_eq!(out.markdown, "# Docling Technical Report\n");
        assert_eq!(out.page_count, 3);
    }

    #[test]
    fn missing_json_content_means_zero_pages() {
        let response: ConvertResponse = serde_json::from_value(json!({
            "document": {"md_content": "hello"},
            "status": "partial_success",
        }))
        .unwrap();
        assert_eq!(into_output(response).unwrap().page_count, 0);
    }

    #[test]
    fn failure_status_surfaces_backend_error_class() {
        let response: ConvertResponse = serde_json::from_value(json!({
            "document": {"md_content": ""},
            "status": "failure",
            "errors": [{
                "component_type": "document_backend",
                "module_name": "docling.backend.pypdfium2_backend.PdfiumError",
                "error_message": "Failed to load document",
            }],
        }))
        .unwrap();

        let err = into_output(response).unwrap_err();
        assert_eq!(err.error_type(), "PdfiumError");
        assert_eq!(err.to_string(), "Failed to load document");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn failure_without_details_uses_generic_kind() {
        let response: ConvertResponse =
            serde_json::from_value(json!({"status": "skipped"})).unwrap();
        let err = into_output(response).unwrap_err();
        assert_eq!(err.error_type(), "ConversionError");
        assert!(err.to_string().contains("skipped"));
    }

    #[test]
    fn unprocessable_document_is_caller_caused() {
        let err = http_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"loc":["body"],"msg":"File format not allowed"}]}"#,
        );
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_type(), "UnsupportedDocument");
        assert!(err.to_string().contains("File format not allowed"));
    }

    #[test]
    fn backend_faults_are_server_errors() {
        let err = http_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("HTTP 500"));

        let err = http_error(StatusCode::UNAUTHORIZED, r#"{"detail":"Invalid API key"}"#);
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[test]
    fn endpoint_joins_base_url() {
        let config = GatewayConfig::builder()
            .docling_url("http://docling:5001/")
            .build()
            .unwrap();
        let backend = DoclingServeBackend::new(&config).unwrap();
        assert_eq!(backend.endpoint(), "http://docling:5001/v1/convert/source");
    }
}
