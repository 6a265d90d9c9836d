//! Input resolution: normalise a request body into a [`ConversionRequest`].
//!
//! The body is the same JSON object on every surface; the envelope adapters
//! have already unwrapped it. Resolution rules:
//!
//! 1. `source_url` (non-empty) wins, even when `document` is also present.
//! 2. Otherwise `document` (non-empty) is base64-decoded into bytes.
//! 3. Otherwise the request is rejected with [`GatewayError::MissingSource`].
//!
//! Unknown fields are ignored so older gateways accept newer clients.

use crate::error::GatewayError;
use crate::model::{
    ConversionOptions, ConversionRequest, DocumentSource, DEFAULT_FILENAME, DEFAULT_IMAGE_SCALE,
};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Largest accepted `image_resolution_scale`.
pub const MAX_IMAGE_SCALE: f64 = 10.0;

/// Standard alphabet, padding optional. Clients routinely strip `=`.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Wire shape of the request body.
#[derive(Debug, Default, Deserialize)]
struct RequestBody {
    source_url: Option<String>,
    document: Option<String>,
    filename: Option<String>,
    extract_tables_as_images: Option<bool>,
    image_resolution_scale: Option<f64>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a request body into a conversion request.
pub fn resolve_request(payload: &Value) -> Result<ConversionRequest, GatewayError> {
    if !payload.is_object() {
        return Err(GatewayError::InvalidBody {
            detail: "expected a JSON object".into(),
        });
    }
    let body = RequestBody::deserialize(payload).map_err(|e| GatewayError::InvalidBody {
        detail: e.to_string(),
    })?;

    let options = resolve_options(&body)?;
    let filename = non_empty(body.filename).unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    let source = match (non_empty(body.source_url), non_empty(body.document)) {
        (Some(url), _) => {
            let url = url.trim().to_string();
            if !is_url(&url) {
                return Err(GatewayError::InvalidSourceUrl { url });
            }
            debug!("Resolved remote source: {}", url);
            DocumentSource::Url(url)
        }
        (None, Some(encoded)) => {
            let bytes = decode_document(&encoded)?;
            debug!("Resolved inline source '{}': {} bytes", filename, bytes.len());
            DocumentSource::Bytes(bytes)
        }
        (None, None) => return Err(GatewayError::MissingSource),
    };

    Ok(ConversionRequest {
        source,
        filename,
        options,
    })
}

/// Decode the `document` field.
///
/// ASCII whitespace (line-wrapped base64) and a leading
/// `data:<mime>;base64,` prefix are tolerated.
pub fn decode_document(encoded: &str) -> Result<Vec<u8>, GatewayError> {
    let encoded = strip_data_uri_prefix(encoded.trim());
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = LENIENT_BASE64
        .decode(compact.as_bytes())
        .map_err(|e| GatewayError::InvalidBase64 {
            detail: e.to_string(),
        })?;

    if bytes.is_empty() {
        return Err(GatewayError::InvalidBase64 {
            detail: "decoded document is empty".into(),
        });
    }
    Ok(bytes)
}

/// Last non-empty path segment of a URL, if it looks like a file name.
pub fn url_file_name(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.rev().find(|s| !s.is_empty())?;
    Some(last.to_string())
}

fn resolve_options(body: &RequestBody) -> Result<ConversionOptions, GatewayError> {
    let scale = body.image_resolution_scale.unwrap_or(DEFAULT_IMAGE_SCALE);
    if !scale.is_finite() || scale <= 0.0 || scale > MAX_IMAGE_SCALE {
        return Err(GatewayError::InvalidOption {
            field: "image_resolution_scale",
            detail: format!("must be greater than 0 and at most {MAX_IMAGE_SCALE}, got {scale}"),
        });
    }

    Ok(ConversionOptions {
        extract_tables_as_images: body.extract_tables_as_images.unwrap_or(false),
        image_resolution_scale: scale,
    })
}

fn strip_data_uri_prefix(s: &str) -> &str {
    if s.starts_with("data:") {
        if let Some((_, rest)) = s.split_once(";base64,") {
            return rest;
        }
    }
    s
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // "%PDF-1.4 test"
    const PDF_B64: &str = "JVBERi0xLjQgdGVzdA==";

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("ftp://example.com/doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn missing_both_sources() {
        let err = resolve_request(&json!({})).unwrap_err();
        assert!(matches!(err, GatewayError::MissingSource));
    }

    #[test]
    fn empty_and_null_fields_count_as_missing() {
        let err = resolve_request(&json!({"source_url": "", "document": null})).unwrap_err();
        assert!(matches!(err, GatewayError::MissingSource));

        let err = resolve_request(&json!({"source_url": "   ", "document": ""})).unwrap_err();
        assert!(matches!(err, GatewayError::MissingSource));
    }

    #[test]
    fn filename_and_options_resolve_together() {
        let req = resolve_request(&json!({
            "document": PDF_B64,
            "filename": "slides.pptx",
            "extract_tables_as_images": true,
            "image_resolution_scale": 3.5,
        }))
        .unwrap();
        assert_eq!(req.filename, "slides.pptx");
        assert!(req.options.extract_tables_as_images);
        assert_eq!(req.options.image_resolution_scale, 3.5);
    }

    #[test]
    fn inline_document_is_decoded() {
        let req = resolve_request(&json!({"document": PDF_B64})).unwrap();
        assert_eq!(req.source, DocumentSource::Bytes(b"%PDF-1.4 test".to_vec()));
        assert_eq!(req.filename, DEFAULT_FILENAME);
        assert_eq!(req.options, ConversionOptions::default());
    }

    #[test]
    fn unpadded_and_wrapped_base64_is_accepted() {
        let req = resolve_request(&json!({"document": "JVBERi0x\nLjQgdGVzdA"})).unwrap();
        assert_eq!(req.source, DocumentSource::Bytes(b"%PDF-1.4 test".to_vec()));
    }

    #[test]
    fn data_uri_prefix_is_tolerated() {
        let doc = format!("data:application/pdf;base64,{PDF_B64}");
        let req = resolve_request(&json!({ "document": doc })).unwrap();
        assert_eq!(req.source, DocumentSource::Bytes(b"%PDF-1.4 test".to_vec()));
    }

    #[test]
    fn malformed_base64_is_an_input_error() {
        let err = resolve_request(&json!({"document": "not*base64!"})).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidBase64 { .. }));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn source_url_takes_precedence_over_document() {
        let req = resolve_request(&json!({
            "source_url": "https://arxiv.org/pdf/2408.09869",
            "document": "this is not even base64!",
        }))
        .unwrap();
        assert_eq!(
            req.source,
            DocumentSource::Url("https://arxiv.org/pdf/2408.09869".into())
        );
        assert_eq!(req.source_label(), "https://arxiv.org/pdf/2408.09869");
    }

    #[test]
    fn non_http_url_is_rejected() {
        let err = resolve_request(&json!({"source_url": "file:///etc/passwd"})).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidSourceUrl { .. }));
    }

    #[test]
    fn options_are_read() {
        let req = resolve_request(&json!({
            "document": PDF_B64,
            "filename": "slides.pptx",
            "extract_tables_as_images": true,
            "image_resolution_scale": 3,
        }))
        .unwrap();
        assert_eq!(req.filename, "slides.pptx");
        assert!(req.options.extract_tables_as_images);
        assert_eq!(req.options.image_resolution_scale, 3.0);
    }

    #[test]
    fn out_of_range_scale_is_rejected() {
        for scale in [json!(0), json!(-1), json!(11.5)] {
            let err = resolve_request(&json!({"document": PDF_B64, "image_resolution_scale": scale}))
                .unwrap_err();
            assert!(matches!(
                err,
                GatewayError::InvalidOption {
                    field: "image_resolution_scale",
                    ..
                }
            ));
        }
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let req = resolve_request(&json!({
            "document": PDF_B64,
            "ocr_engine": "tesseract",
            "nested": {"x": 1},
        }))
        .unwrap();
        assert!(matches!(req.source, DocumentSource::Bytes(_)));
    }

    #[test]
    fn wrong_field_type_is_invalid_body() {
        let err = resolve_request(&json!({"source_url": 42})).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidBody { .. }));

        let err = resolve_request(&json!(["document"])).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidBody { .. }));
    }

    #[test]
    fn url_file_name_takes_last_segment() {
        assert_eq!(
            url_file_name("https://example.com/papers/attention.pdf?dl=1").as_deref(),
            Some("attention.pdf")
        );
        assert_eq!(
            url_file_name("https://arxiv.org/pdf/2408.09869/").as_deref(),
            Some("2408.09869")
        );
        assert_eq!(url_file_name("https://example.com/"), None);
    }
}
