use crate::UrlError;
use url::{Position, Url};

/// Parses and normalizes a URL string
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an `http` or `https` scheme and a host
/// 3. Remove fragment (everything after #)
/// 4. Empty path becomes /
/// 5. Sort query parameters by key, then by value, so that multi-valued
///    parameters get one canonical form
/// 6. Remove empty query string (trailing ?)
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use staticator::url::normalize_url;
///
/// let url = normalize_url("https://example.com/tag?b=2&a=3&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/tag?a=1&a=3&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize(&url)
}

/// Normalizes an already parsed URL
///
/// See [`normalize_url`] for the rules applied.
pub fn normalize(url: &Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    let mut url = url.clone();
    url.set_fragment(None);

    if url.path().is_empty() {
        url.set_path("/");
    }

    if url.query().is_some() {
        let params = sorted_query_params(&url);

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Collects query parameters sorted by key and then by value
fn sorted_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

/// Returns the root-relative form of a URL (path, query and fragment)
///
/// ```
/// use staticator::url::root_relative;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/a/b?x=1#c").unwrap();
/// assert_eq!(root_relative(&url), "/a/b?x=1#c");
/// ```
pub fn root_relative(url: &Url) -> &str {
    &url[Position::BeforePath..]
}

/// Returns the store key for a URL: the root-relative form of its
/// normalized version, without fragment
pub fn storage_key(url: &Url) -> Result<String, UrlError> {
    let normalized = normalize(url)?;
    Ok(root_relative(&normalized).to_string())
}
