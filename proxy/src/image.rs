use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::analyzer::ImageInput;

pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Standard alphabet, padding optional.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode an image given either as raw base64 or as a `data:image/...;base64,` URI.
///
/// Returns `None` when the payload is not valid base64 or decodes to nothing.
/// Content bytes are not inspected.
pub fn decode_image_payload(raw: &str) -> Option<ImageInput> {
    let (mime_type, payload) = split_data_uri(raw);

    let cleaned: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = LENIENT.decode(cleaned.as_bytes()).ok()?;
    if bytes.is_empty() {
        return None;
    }

    Some(ImageInput { mime_type, bytes })
}

/// Split a data URI into (mime type, payload). Anything else is treated as a bare payload.
fn split_data_uri(raw: &str) -> (String, &str) {
    if !raw.starts_with("data:image") {
        return (DEFAULT_MIME_TYPE.to_string(), raw);
    }

    let Some((header, payload)) = raw.split_once(',') else {
        return (DEFAULT_MIME_TYPE.to_string(), raw);
    };

    let mime = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .map(str::trim)
        .filter(|m| m.starts_with("image/") && m.len() > "image/".len())
        .unwrap_or(DEFAULT_MIME_TYPE);

    (mime.to_string(), payload)
}

/// Pick the upstream MIME type for an uploaded file.
pub fn upload_mime_type(content_type: Option<&str>) -> String {
    content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim())
        .filter(|ct| ct.starts_with("image/") && ct.len() > "image/".len())
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

/// 1x1 PNG, base64.
#[cfg(test)]
pub(crate) const TINY_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_base64() {
        let img = decode_image_payload(TINY_PNG).unwrap();
        assert_eq!(img.mime_type, "image/png");
        assert_eq!(&img.bytes[1..4], b"PNG");
    }

    #[test]
    fn test_data_uri() {
        let uri = format!("data:image/png;base64,{TINY_PNG}");
        let img = decode_image_payload(&uri).unwrap();
        assert_eq!(img.mime_type, "image/png");
        assert_eq!(&img.bytes[1..4], b"PNG");
    }

    #[test]
    fn test_data_uri_keeps_declared_type() {
        let img = decode_image_payload("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(img.mime_type, "image/jpeg");
    }

    #[test]
    fn test_rejects_invalid_base64() {
        assert!(decode_image_payload("not-base64!!").is_none());
        assert!(decode_image_payload("data:image/png;base64,@@@").is_none());
    }

    #[test]
    fn test_data_uri_without_comma_is_invalid() {
        assert!(decode_image_payload("data:image/png;base64").is_none());
    }

    #[test]
    fn test_empty_payload_is_invalid() {
        assert!(decode_image_payload("data:image/png;base64,").is_none());
        assert!(decode_image_payload("   ").is_none());
    }

    #[test]
    fn test_whitespace_and_missing_padding() {
        let wrapped = format!("{}\n{}", &TINY_PNG[..40], &TINY_PNG[40..]);
        assert!(decode_image_payload(&wrapped).is_some());
        assert!(decode_image_payload(TINY_PNG.trim_end_matches('=')).is_some());
    }

    #[test]
    fn test_non_png_content_is_accepted() {
        // "hello" -- valid base64, not an image
        let img = decode_image_payload("aGVsbG8=").unwrap();
        assert_eq!(img.bytes, b"hello");
    }

    #[test]
    fn test_upload_mime_type() {
        assert_eq!(upload_mime_type(Some("image/jpeg")), "image/jpeg");
        assert_eq!(upload_mime_type(Some("image/webp; q=1")), "image/webp");
        assert_eq!(upload_mime_type(Some("application/octet-stream")), "image/png");
        assert_eq!(upload_mime_type(None), "image/png");
    }
}
