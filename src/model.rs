//! Per-request data model: what to convert and what came back.

use serde::Serialize;

/// Filename used when the caller does not supply one.
pub const DEFAULT_FILENAME: &str = "document.pdf";

/// Default `image_resolution_scale`.
pub const DEFAULT_IMAGE_SCALE: f64 = 2.0;

/// Where the document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    /// Remote document; the backend fetches it.
    Url(String),
    /// Inline document, already base64-decoded.
    Bytes(Vec<u8>),
}

/// Knobs forwarded to the converter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionOptions {
    /// Render tables as pictures instead of markdown tables.
    pub extract_tables_as_images: bool,
    /// Scale factor applied when rasterising extracted images.
    pub image_resolution_scale: f64,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            extract_tables_as_images: false,
            image_resolution_scale: DEFAULT_IMAGE_SCALE,
        }
    }
}

/// A normalised conversion request, independent of the hosting envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub source: DocumentSource,
    /// Extension hint for inline bytes; defaults to [`DEFAULT_FILENAME`].
    pub filename: String,
    pub options: ConversionOptions,
}

impl ConversionRequest {
    /// The URL for remote sources, the filename for inline ones.
    pub fn source_label(&self) -> &str {
        match &self.source {
            DocumentSource::Url(url) => url,
            DocumentSource::Bytes(_) => &self.filename,
        }
    }
}

/// An image lifted out of the converted markdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedImage {
    /// Relative filename, as referenced from the markdown.
    pub name: String,
    pub data: Vec<u8>,
}

/// What one conversion produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub markdown: String,
    pub page_count: usize,
    /// URL or filename of the source document.
    pub source_label: String,
    /// Images in order of first reference; empty in markdown mode.
    pub images: Vec<ExtractedImage>,
}

/// Which output shape the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Inline JSON with the markdown text.
    #[default]
    Markdown,
    /// Zip bundle of markdown plus extracted images.
    Export,
}

impl ResponseMode {
    /// Pick the mode from a request path: a trailing `full` segment means export.
    ///
    /// ```rust
    /// use docling_gateway::ResponseMode;
    ///
    /// assert_eq!(ResponseMode::from_path("/full"), ResponseMode::Export);
    /// assert_eq!(ResponseMode::from_path("/prod/convert/full/"), ResponseMode::Export);
    /// assert_eq!(ResponseMode::from_path("/"), ResponseMode::Markdown);
    /// ```
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/').rsplit('/').next() {
            Some("full") => ResponseMode::Export,
            _ => ResponseMode::Markdown,
        }
    }

    /// Whether the converter should embed image data in its markdown.
    pub fn wants_images(self) -> bool {
        self == ResponseMode::Export
    }
}
