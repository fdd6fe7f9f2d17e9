//! Object naming helpers shared by both backends

/// Content type assumed when the bytes do not identify themselves
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

const MAX_KEY_LEN: usize = 200;
const MAX_HINT_LEN: usize = 100;

/// Make `key` safe for use as an object key or public id.
///
/// Spaces become `_`, anything outside `[A-Za-z0-9_\-./]` is dropped and the
/// result is capped at 200 characters. An empty result becomes `image`.
pub fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
        .take(MAX_KEY_LEN)
        .collect();

    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

/// Derive a name hint from the URL an image was fetched from.
///
/// ```
/// use shotrelay_storage::naming::name_hint_from_url;
///
/// assert_eq!(
///     name_hint_from_url("https://cache.example.com/shots/abc.jpeg"),
///     "cache.example.com_shots_abc.jpeg"
/// );
/// ```
pub fn name_hint_from_url(image_url: &str) -> String {
    image_url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .replace('/', "_")
        .chars()
        .take(MAX_HINT_LEN)
        .collect()
}

/// Identify JPEG, PNG and WebP by their magic bytes, defaulting to JPEG
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        "image/webp"
    } else {
        DEFAULT_CONTENT_TYPE
    }
}

/// File extension for an image content type
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// Normalise a folder segment: surrounding slashes and whitespace are
/// removed, and a blank folder means the root.
pub fn normalize_folder(folder: Option<&str>) -> Option<String> {
    folder
        .map(|f| f.trim().trim_matches('/').to_string())
        .filter(|f| !f.is_empty())
}
