use crate::UrlError;
use url::Url;

/// The set of hosts whose URLs belong to the archived site
///
/// Hosts are compared case-insensitively and with any leading `www.`
/// removed, so `www.example.com` and `example.com` are the same site. Ports
/// are not part of the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHosts {
    origin: String,
    aliases: Vec<String>,
}

impl LocalHosts {
    /// Creates the host set from the seed's origin host and alias hosts
    pub fn new(origin: &str, aliases: &[String]) -> Self {
        let origin = bare_host(origin);
        let mut bare_aliases: Vec<String> = Vec::with_capacity(aliases.len());
        for alias in aliases {
            let alias = bare_host(alias);
            if !alias.is_empty() && alias != origin && !bare_aliases.contains(&alias) {
                bare_aliases.push(alias);
            }
        }

        Self {
            origin,
            aliases: bare_aliases,
        }
    }

    /// Creates the host set from a seed URL
    pub fn from_seed(seed: &Url, aliases: &[String]) -> Result<Self, UrlError> {
        let host = seed.host_str().ok_or(UrlError::MissingDomain)?;
        Ok(Self::new(host, aliases))
    }

    /// The origin host, without `www.`
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Returns true if the host names the site
    pub fn is_local_host(&self, host: &str) -> bool {
        let host = bare_host(host);
        host == self.origin || self.aliases.iter().any(|alias| *alias == host)
    }

    /// Returns true if the URL is an http(s) URL on one of the site's hosts
    pub fn is_local(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        url.host_str().map_or(false, |host| self.is_local_host(host))
    }

    /// Every spelling of every local host, with and without `www.`
    ///
    /// Used for textual scrubbing where no URL parsing happens.
    pub fn spellings(&self) -> Vec<String> {
        std::iter::once(&self.origin)
            .chain(self.aliases.iter())
            .flat_map(|host| [format!("www.{}", host), host.clone()])
            .collect()
    }
}

/// Lowercases a host and strips one leading `www.`
fn bare_host(host: &str) -> String {
    let host = host.trim().to_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}
