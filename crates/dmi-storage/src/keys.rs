//! Shared key generation for storage backends.

/// Top-level prefix for intake uploads.
pub const UPLOAD_PREFIX: &str = "data";

/// Generate a storage key for an upload of `file_type`.
///
/// The file type tag is reduced to `[a-z0-9_-]` so it is always a single safe
/// path segment.
pub fn generate_storage_key(file_type: &str, filename: &str) -> String {
    let segment: String = file_type
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let segment = if segment.is_empty() {
        "untyped".to_string()
    } else {
        segment
    };
    format!("{}/{}/{}", UPLOAD_PREFIX, segment, filename)
}

/// Reject keys that could escape the storage root.
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty() && !key.contains("..") && !key.starts_with('/') && !key.contains('\\')
}
