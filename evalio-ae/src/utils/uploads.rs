//! Answer recording storage helpers

use std::path::Path;

/// MIME types accepted for answer recordings
const ALLOWED_MIME_TYPES: &[&str] = &[
    "audio/webm",
    "audio/wav",
    "audio/x-wav",
    "audio/mpeg",
    "audio/mp3",
    "audio/mp4",
    "audio/x-m4a",
    "audio/aac",
];

/// File extensions accepted for answer recordings
const ALLOWED_EXTENSIONS: &[&str] = &["webm", "wav", "mp3", "m4a", "aac"];

/// Extension used when the upload does not carry an allowed one
const FALLBACK_EXTENSION: &str = "webm";

fn extension_of(original_name: &str) -> Option<String> {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Accept when either the extension or the declared MIME type is known
pub fn is_supported_audio(original_name: &str, mime_type: &str) -> bool {
    let ext_ok = extension_of(original_name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    let mime_ok = ALLOWED_MIME_TYPES.contains(&mime_type.trim().to_ascii_lowercase().as_str());
    ext_ok || mime_ok
}

/// Collision-free on-disk name: `<sanitised-base>-<millis>-<random>.<ext>`
pub fn stored_file_name(original_name: &str) -> String {
    let ext = extension_of(original_name)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("answer");
    let mut base: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(64)
        .collect();
    if base.is_empty() {
        base.push_str("answer");
    }

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}.{}",
        base,
        chrono::Utc::now().timestamp_millis(),
        &suffix[..10],
        ext
    )
}

/// Best-effort removal of an uploaded recording
///
/// Already-missing files are fine; other failures are logged, never raised.
pub async fn discard_upload(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Discarded answer upload"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to delete answer upload"
        ),
    }
}
