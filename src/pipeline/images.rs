//! Embedded-image extraction for export bundles.
//!
//! In export mode the backend returns markdown whose pictures are inlined as
//! `![alt](data:image/png;base64,...)`. This module lifts each of those
//! payloads out into an [`ExtractedImage`] and rewrites the reference to a
//! relative filename, so the markdown and the images can sit side by side in
//! a flat zip archive.
//!
//! File names are `image_<index>_<hash>.<ext>`: a six-digit zero-padded
//! sequence number (in order of appearance, starting at 0), the first 16 hex
//! characters of the SHA-256 of the bytes, and an extension taken from the
//! MIME type or sniffed from the bytes.

use crate::model::ExtractedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

static RE_DATA_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(\s*data:(image/[A-Za-z0-9.+-]+);base64,([A-Za-z0-9+/=\s]+?)\s*\)")
        .unwrap()
});

/// Replace every embedded data-URI image with a relative file reference.
///
/// Returns the rewritten markdown and the images, in the order they appear.
/// References whose payload does not decode are left as they are.
pub fn extract_embedded_images(markdown: &str) -> (String, Vec<ExtractedImage>) {
    let mut images: Vec<ExtractedImage> = Vec::new();

    let rewritten = RE_DATA_IMAGE.replace_all(markdown, |caps: &Captures<'_>| {
        let alt = &caps[1];
        let mime = &caps[2];
        let payload: String = caps[3].chars().filter(|c| !c.is_ascii_whitespace()).collect();

        let data = match STANDARD.decode(payload.as_bytes()) {
            Ok(d) if !d.is_empty() => d,
            Ok(_) => {
                warn!("Skipping empty embedded image #{}", images.len());
                return caps[0].to_string();
            }
            Err(e) => {
                warn!("Skipping undecodable embedded image #{}: {}", images.len(), e);
                return caps[0].to_string();
            }
        };

        let name = image_file_name(images.len(), mime, &data);
        debug!("Extracted {} ({} bytes)", name, data.len());
        let reference = format!("![{alt}]({name})");
        images.push(ExtractedImage { name, data });
        reference
    });

    (rewritten.into_owned(), images)
}

/// Build the archive file name for the `index`-th image.
pub fn image_file_name(index: usize, mime: &str, data: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(data));
    format!(
        "image_{index:06}_{}.{}",
        &digest[..16],
        image_extension(mime, data)
    )
}

/// Extension for an image, from its MIME subtype or, failing that, its bytes.
fn image_extension(mime: &str, data: &[u8]) -> &'static str {
    let subtype = mime.strip_prefix("image/").unwrap_or(mime);
    match subtype.to_ascii_lowercase().as_str() {
        "png" => "png",
        "jpeg" | "jpg" | "pjpeg" => "jpg",
        "gif" => "gif",
        "webp" => "webp",
        "bmp" => "bmp",
        "tiff" => "tiff",
        "svg+xml" => "svg",
        _ => image::guess_format(data)
            .ok()
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("bin"),
    }
}
