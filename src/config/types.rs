use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Declarative description of an archived site
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Human readable site name
    pub name: String,

    /// Hosts the site is served from
    pub domains: Vec<String>,

    /// Named resource types, matched against request paths
    #[serde(default)]
    pub resources: Vec<ResourcePattern>,
}

/// A named resource type identified by a path pattern
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourcePattern {
    pub name: String,

    /// Regular expression over the URL path, with named capture groups
    pub path: String,

    /// Names of resource types linked from this one that should be followed
    #[serde(default)]
    pub follow: Vec<String>,

    /// Bindings from capture group names to page metadata properties
    #[serde(default)]
    pub metadata: Vec<MetadataBinding>,

    /// Derived pages to refresh together with this resource
    #[serde(default)]
    pub related: Vec<ResourcePattern>,
}

/// Maps a capture group to a metadata property of the page
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataBinding {
    pub var: String,
    pub property: String,
}

/// How `<link>` and `<meta>` elements are treated during rewriting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadLinkMode {
    /// Leave them untouched
    Skip,

    /// Relativize same-origin URLs, fetch nothing
    #[default]
    Relativize,

    /// Relativize, and capture same-origin alternate links (feeds, oEmbed)
    /// raw without crawling them
    Capture,
}

impl HeadLinkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Relativize => "relativize",
            Self::Capture => "capture",
        }
    }
}

impl fmt::Display for HeadLinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeadLinkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "relativize" => Ok(Self::Relativize),
            "capture" => Ok(Self::Capture),
            other => Err(format!(
                "unknown head link mode '{}', expected skip, relativize or capture",
                other
            )),
        }
    }
}

/// Settings for one crawl run
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// URL the crawl starts from; its host is the site's origin
    pub seed: Url,

    /// Maximum number of fetches issued this run
    pub fetch_limit: usize,

    /// Maximum number of fetches in flight at once
    pub max_parallel: usize,

    /// Additional hosts treated as the same site
    pub aliases: Vec<String>,

    pub head_links: HeadLinkMode,

    pub user_agent: String,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,

    /// Archive 4xx/5xx responses like any other page; when false they are
    /// per-URL failures and nothing is stored
    pub store_error_pages: bool,
}

impl CrawlerConfig {
    /// Creates a configuration with defaults for everything but the seed
    pub fn new(seed: Url) -> Self {
        Self {
            seed,
            fetch_limit: 1,
            max_parallel: 1,
            aliases: Vec::new(),
            head_links: HeadLinkMode::default(),
            user_agent: default_user_agent(),
            request_timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
            store_error_pages: true,
        }
    }
}

/// User agent sent when none is configured
pub fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
