//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with redirects disabled at the transport level
//! - GET requests that turn one URL into one [`Resource`]
//! - Redirect responses recorded as redirect resources
//! - Content-type classification (HTML is rewritten, anything else is kept raw)

use crate::config::CrawlerConfig;
use crate::crawler::rewriter::{Discovered, LinkRewriter};
use crate::resource::Resource;
use crate::url::{root_relative, LocalHosts};
use crate::StaticatorError;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use std::time::Duration;
use url::Url;

/// The result of fetching one URL
#[derive(Debug)]
pub struct FetchedPage {
    /// What to store for the URL
    pub resource: Resource,

    /// Absolute URLs referenced by the resource
    pub discovered: Discovered,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawl settings (user agent, timeout, TLS verification)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use staticator::config::CrawlerConfig;
/// use staticator::crawler::build_http_client;
/// use url::Url;
///
/// let config = CrawlerConfig::new(Url::parse("https://example.com/").unwrap());
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    if config.accept_invalid_certs {
        tracing::warn!("TLS certificate verification is disabled");
    }

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none()) // Redirects are archived, not followed
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true for the statuses archived as redirect records
pub fn is_redirect_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Returns true if a Content-Type header value names an HTML document
///
/// Parameters after `;` are ignored. A missing or empty value counts as HTML.
pub fn is_html_content_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    media_type.is_empty() || media_type == "text/html" || media_type == "application/xhtml+xml"
}

/// Parses the `Location` header of a redirect response
///
/// The value must be an absolute URL or an absolute path; it is resolved
/// against the URL that was requested.
pub fn redirect_location(url: &Url, response: &Response) -> Result<Url, StaticatorError> {
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim()
        .to_string();

    let invalid = || StaticatorError::InvalidRedirect {
        url: url.to_string(),
        location: location.clone(),
    };

    if location.starts_with('/') && !location.starts_with("//") {
        return url.join(&location).map_err(|_| invalid());
    }

    match Url::parse(&location) {
        Ok(target) if target.has_host() => Ok(target),
        _ => Err(invalid()),
    }
}

/// The redirect record stored for a hop to `target`
///
/// Local targets are stored root-relative so the archive does not depend on
/// the origin host; off-site targets are stored as given.
pub fn redirect_record(target: &Url, hosts: &LocalHosts) -> Resource {
    if hosts.is_local(target) {
        Resource::redirect(root_relative(target))
    } else {
        Resource::redirect(target.as_str())
    }
}

/// Returns the Content-Type header of a response, or an empty string
pub fn content_type_of(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// Fetches one URL and turns it into a resource
///
/// # Request Flow
///
/// 1. Send one GET request; redirects are never followed
/// 2. Redirect status → redirect record, target is the only discovered link
/// 3. Other non-success status → stored like a success, or an error when
///    `store_error_pages` is off
/// 4. Non-HTML content type → raw body with the served content type
/// 5. HTML → rewritten document, links found by the rewriter
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `rewriter` - The site's link rewriter
/// * `store_error_pages` - Whether 4xx/5xx bodies are archived
///
/// # Returns
///
/// * `Ok(FetchedPage)` - The resource to store and the URLs it references
/// * `Err(StaticatorError)` - Network failure, bad status, bad redirect, or
///   rewrite failure; all are scoped to this URL
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    rewriter: &LinkRewriter,
    store_error_pages: bool,
) -> Result<FetchedPage, StaticatorError> {
    tracing::info!(url = %url, "Fetching");

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| StaticatorError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();

    if is_redirect_status(status) {
        let target = redirect_location(url, &response)?;
        tracing::info!(url = %url, target = %target, "Found redirect");
        return Ok(FetchedPage {
            resource: redirect_record(&target, rewriter.hosts()),
            discovered: Discovered {
                pages: vec![target],
                captures: Vec::new(),
            },
        });
    }

    if !status.is_success() {
        if !store_error_pages {
            return Err(StaticatorError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        tracing::warn!(url = %url, status = status.as_u16(), "Archiving error response");
    }

    let content_type = content_type_of(&response);
    let body = response
        .bytes()
        .await
        .map_err(|source| StaticatorError::Http {
            url: url.to_string(),
            source,
        })?;

    if !is_html_content_type(&content_type) {
        tracing::debug!(url = %url, content_type = %content_type, "Keeping non-HTML body as is");
        return Ok(FetchedPage {
            resource: Resource::page(body.to_vec(), content_type),
            discovered: Discovered::default(),
        });
    }

    let staticated = rewriter
        .staticate(&body, url)
        .map_err(|e| StaticatorError::HtmlRewrite {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    Ok(FetchedPage {
        resource: Resource::html(staticated.content),
        discovered: staticated.discovered,
    })
}
