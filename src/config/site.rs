//! Resource-type classification against a site configuration

use crate::config::types::{ResourcePattern, SiteConfig};
use regex::Regex;
use std::collections::BTreeMap;
use url::Url;

/// A resource type that matched a URL path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMatch {
    /// Name of the matching resource type
    pub name: String,

    /// Named capture groups and the path text they matched
    pub captures: BTreeMap<String, String>,

    /// Names of the related resource types to refresh alongside
    pub related: Vec<String>,
}

impl SiteConfig {
    /// Returns true if the host is one of the site's domains
    ///
    /// Comparison ignores case and a leading `www.`.
    pub fn serves_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        self.domains.iter().any(|domain| {
            let domain = domain.to_lowercase();
            domain.strip_prefix("www.").unwrap_or(&domain) == host
        })
    }

    /// Classifies a URL by the first top-level resource pattern matching its
    /// path
    ///
    /// Patterns that fail to compile never match; validation rejects them at
    /// load time.
    pub fn classify(&self, url: &Url) -> Option<ResourceMatch> {
        let path = url.path();
        self.resources
            .iter()
            .find_map(|resource| match_resource(resource, path))
    }
}

fn match_resource(resource: &ResourcePattern, path: &str) -> Option<ResourceMatch> {
    let pattern = Regex::new(&resource.path).ok()?;
    let found = pattern.captures(path)?;

    let captures = pattern
        .capture_names()
        .flatten()
        .filter_map(|name| {
            found
                .name(name)
                .map(|m| (name.to_string(), m.as_str().to_string()))
        })
        .collect();

    Some(ResourceMatch {
        name: resource.name.clone(),
        captures,
        related: resource.related.iter().map(|r| r.name.clone()).collect(),
    })
}
