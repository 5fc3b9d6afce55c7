//! URL handling module for Staticator
//!
//! This module provides URL normalization (the canonical form used by the
//! seen-set and as store keys), root-relative conversion, and the locality
//! test that decides which URLs belong to the archived site.

mod locality;
mod normalize;

pub use locality::LocalHosts;
pub use normalize::{normalize, normalize_url, root_relative, storage_key};

use url::Url;

/// Returns true if the URL's last path segment has no `.`
///
/// This is the heuristic separating crawlable pages (`/archive/42`) from
/// static assets (`/photo/IMG_1.jpg`).
///
/// # Examples
///
/// ```
/// use staticator::url::looks_dynamic;
/// use url::Url;
///
/// assert!(looks_dynamic(&Url::parse("https://example.com/archive/42").unwrap()));
/// assert!(!looks_dynamic(&Url::parse("https://example.com/photo/IMG_1.jpg").unwrap()));
/// ```
pub fn looks_dynamic(url: &Url) -> bool {
    let last_segment = url
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or("");

    !last_segment.contains('.')
}
