//! Staticator: archives a dynamic website into a static, link-relative snapshot
//!
//! This crate crawls a site from a seed URL with bounded parallelism, rewrites
//! every same-origin link into root-relative form, and persists each page (or
//! redirect record) into a pluggable resource store. A small read-path server
//! replays the archive.

pub mod config;
pub mod crawler;
pub mod logging;
pub mod output;
pub mod resource;
pub mod server;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Staticator operations
#[derive(Debug, Error)]
pub enum StaticatorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid redirect from {url}: {location:?}")]
    InvalidRedirect { url: String, location: String },

    #[error("HTML rewrite error for {url}: {message}")]
    HtmlRewrite { url: String, message: String },

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{host} is not one of the site's domains")]
    ForeignDomain { host: String },

    #[error("No resource type in the site configuration matches {path}")]
    UnknownResource { path: String },

    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

impl StaticatorError {
    /// Returns true when the error must abort the whole crawl run
    ///
    /// Only store failures are fatal. Everything else is scoped to the single
    /// URL that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Staticator operations
pub type Result<T> = std::result::Result<T, StaticatorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{CrawlerConfig, HeadLinkMode, SiteConfig};
pub use crawler::{crawl, CrawlReport};
pub use resource::Resource;
pub use storage::{open_store, Store, StoreError};
pub use url::{normalize_url, LocalHosts};
