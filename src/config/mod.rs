//! Configuration module for Staticator
//!
//! This module handles the two kinds of configuration a run uses:
//! - The site configuration, a TOML file describing the site's domains and
//!   named resource path patterns
//! - The crawl settings for a single run, assembled from command-line flags
//!
//! # Example
//!
//! ```no_run
//! use staticator::config::load_site_config;
//! use std::path::Path;
//!
//! let site = load_site_config(Path::new("site.toml")).unwrap();
//! println!("Site {} has {} resource types", site.name, site.resources.len());
//! ```

mod parser;
mod site;
mod types;
mod validation;

pub use types::{
    default_user_agent, CrawlerConfig, HeadLinkMode, MetadataBinding, ResourcePattern, SiteConfig,
};

pub use parser::{
    compute_config_hash, load_site_config, load_site_config_with_hash, parse_site_config,
};
pub use site::ResourceMatch;
pub use validation::{validate_crawler, validate_site, MAX_PARALLEL};
