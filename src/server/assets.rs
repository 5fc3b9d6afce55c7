//! Static asset files served straight from disk

use std::path::{Path, PathBuf};

/// Asset directories served from disk unless configured otherwise
pub const DEFAULT_ASSET_PATHS: &[&str] = &[
    "images",
    "img",
    "movies",
    "photos",
    "presentations",
    "sounds",
    "wp-content/plugins",
    "wp-content/themes",
    "wp-content/uploads",
    "wp-includes/css",
    "wp-includes/js",
];

/// Maps a request path to a file under `root` when it lies inside one of the
/// allowed asset prefixes
///
/// Returns `None` for paths outside every prefix and for any path with a
/// `..` segment.
pub fn asset_file(root: &Path, prefixes: &[String], request_path: &str) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');

    let allowed = prefixes.iter().any(|prefix| {
        let prefix = prefix.trim_matches('/');
        !prefix.is_empty()
            && relative
                .strip_prefix(prefix)
                .map_or(false, |rest| rest.starts_with('/'))
    });
    if !allowed {
        return None;
    }

    if relative.split('/').any(|segment| segment == "..") {
        tracing::debug!("Rejecting asset path {}", request_path);
        return None;
    }

    Some(root.join(relative))
}

/// Content type for an asset, by file extension
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}
