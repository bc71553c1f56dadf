/// Identify an image format from its magic bytes.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        _ => None,
    }
}

/// MIME type for downloaded image bytes.
///
/// An `image/*` `Content-Type` header wins (parameters stripped); otherwise
/// the bytes are sniffed, falling back to `image/png`.
pub fn resolve_image_mime(content_type: Option<&str>, bytes: &[u8]) -> String {
    if let Some(header) = content_type {
        let essence = header.split(';').next().unwrap_or("").trim().to_lowercase();
        if essence.starts_with("image/") {
            return essence;
        }
    }

    match sniff_image_mime(bytes) {
        Some(mime) => mime.to_string(),
        None => {
            tracing::warn!(
                "Unrecognized image format (first 4 bytes: {:02X?}), falling back to image/png",
                &bytes[..bytes.len().min(4)]
            );
            "image/png".to_string()
        }
    }
}
