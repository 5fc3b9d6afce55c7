//! Crawler module for archiving a site
//!
//! This module contains the crawl engine, including:
//! - HTML rewriting and link extraction ("statication")
//! - HTTP fetching with redirects archived rather than followed
//! - Redirect-chain resolution for raw captures
//! - Frontier, seen-set and concurrency scheduling
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod redirect;
mod rewriter;
mod scheduler;

pub use coordinator::{Coordinator, CrawlReport};
pub use fetcher::{build_http_client, fetch_page, is_html_content_type, FetchedPage};
pub use redirect::{RedirectResolver, Resolution, MAX_REDIRECTS};
pub use rewriter::{
    Attributes, Discovered, ElementKind, LinkRewriter, Staticated, SCRIPT_ASSET_PATHS,
};
pub use scheduler::{Admission, Frontier, ScheduledFetch, Scheduler};

use crate::config::{CrawlerConfig, ResourceMatch, SiteConfig};
use crate::storage::Store;
use crate::url::normalize_url;
use crate::StaticatorError;
use std::sync::Arc;

/// Runs a complete crawl operation
///
/// This is the main entry point for archiving a site. It will:
/// 1. Validate the settings and build the HTTP client
/// 2. Admit the seed URL
/// 3. Fetch pages with bounded parallelism
/// 4. Rewrite links and follow same-site ones up to the fetch limit
/// 5. Write every fetched resource to the store
///
/// # Arguments
///
/// * `config` - The crawl settings
/// * `store` - Where fetched resources are written
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed
/// * `Err(StaticatorError)` - Invalid settings or a fatal store failure
pub async fn crawl(
    config: CrawlerConfig,
    store: Arc<dyn Store>,
) -> Result<CrawlReport, StaticatorError> {
    let coordinator = Coordinator::new(config, store)?;
    coordinator.run().await
}

/// Identifies a single resource by the site's path patterns, ready for a
/// targeted crawl
///
/// # Returns
///
/// * `Ok(ResourceMatch)` - The resource type and its captured path variables
/// * `Err(StaticatorError)` - The URL is not on the site or matches no
///   resource type
pub fn classify_resource(url: &str, site: &SiteConfig) -> Result<ResourceMatch, StaticatorError> {
    let url = normalize_url(url)?;
    let host = url.host_str().unwrap_or_default();

    if !site.serves_host(host) {
        return Err(StaticatorError::ForeignDomain {
            host: host.to_string(),
        });
    }

    site.classify(&url)
        .ok_or_else(|| StaticatorError::UnknownResource {
            path: url.path().to_string(),
        })
}

/// Crawls one new resource and the related pages it affects
///
/// Only classification is in place; the crawl itself always fails with
/// [`StaticatorError::NotImplemented`] after the resource is identified.
pub fn crawl_new_resource(url: &str, site: &SiteConfig) -> Result<(), StaticatorError> {
    let found = classify_resource(url, site)?;

    tracing::info!(
        resource = %found.name,
        captures = ?found.captures,
        related = ?found.related,
        "Resource identified: {}",
        url
    );

    Err(StaticatorError::NotImplemented(
        "crawling a single new resource".to_string(),
    ))
}
