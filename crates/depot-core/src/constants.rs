//! Shared constants: setting keys, cache prefixes and metadata keys.

/// Prefix under which upload sessions are stored in the side cache.
pub const UPLOAD_SESSION_CACHE_PREFIX: &str = "callback_";

/// Metadata key marking that a sidecar thumbnail exists next to the file.
pub const THUMB_SIDECAR_METADATA_KEY: &str = "thumb_sidecar";

/// Suffix appended to a source locator to address its sidecar thumbnail.
pub const DEFAULT_THUMB_FILE_SUFFIX: &str = "._thumb";

/// Setting key: largest file (bytes) that may be previewed as editable text.
pub const MAX_EDIT_SIZE_SETTING: &str = "maxEditSize";

/// 2 MiB
pub const DEFAULT_MAX_EDIT_SIZE: i64 = 2 << 20;

/// Setting key: ttl in seconds of signed preview links.
pub const PREVIEW_TIMEOUT_SETTING: &str = "preview_timeout";

/// Setting key: ttl in seconds of signed download links.
pub const DOWNLOAD_TIMEOUT_SETTING: &str = "download_timeout";

/// Fallback ttl (seconds) for preview and download links.
pub const DEFAULT_LINK_TTL_SECS: i64 = 60;

/// Returns true for the string encodings the metadata map uses for `true`.
pub fn is_true_val(value: &str) -> bool {
    value == "1" || value == "true"
}
