use crate::config::types::{CrawlerConfig, ResourcePattern, SiteConfig};
use crate::ConfigError;
use regex::Regex;

/// Upper bound on crawl parallelism
pub const MAX_PARALLEL: usize = 256;

/// Validates a site configuration
pub fn validate_site(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    if config.domains.is_empty() {
        return Err(ConfigError::Validation(format!(
            "site '{}' must list at least one domain",
            config.name
        )));
    }

    for domain in &config.domains {
        validate_domain_string(domain)?;
    }

    validate_resources(&config.resources)?;

    Ok(())
}

/// Validates resource patterns, recursing into related resources
fn validate_resources(resources: &[ResourcePattern]) -> Result<(), ConfigError> {
    for resource in resources {
        if resource.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "resource name cannot be empty".to_string(),
            ));
        }

        let pattern = Regex::new(&resource.path).map_err(|e| {
            ConfigError::InvalidPattern(format!(
                "resource '{}' has invalid path pattern: {}",
                resource.name, e
            ))
        })?;

        for binding in &resource.metadata {
            if !pattern.capture_names().flatten().any(|n| n == binding.var) {
                return Err(ConfigError::Validation(format!(
                    "resource '{}' binds metadata to unknown capture group '{}'",
                    resource.name, binding.var
                )));
            }
        }

        validate_resources(&resource.related)?;
    }

    Ok(())
}

/// Validates the settings of one crawl run
pub fn validate_crawler(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.seed.scheme() != "http" && config.seed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "seed URL '{}' must use http or https",
            config.seed
        )));
    }

    if config.seed.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "seed URL '{}' has no host",
            config.seed
        )));
    }

    if config.fetch_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch limit must be >= 1, got {}",
            config.fetch_limit
        )));
    }

    if config.max_parallel < 1 || config.max_parallel > MAX_PARALLEL {
        return Err(ConfigError::Validation(format!(
            "parallelism must be between 1 and {}, got {}",
            MAX_PARALLEL, config.max_parallel
        )));
    }

    for alias in &config.aliases {
        validate_host(alias)?;
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a host name that may be a single label (e.g. `localhost`)
fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host cannot be empty".to_string(),
        ));
    }

    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot contain consecutive dots",
            host
        )));
    }

    Ok(())
}

/// Validates a site domain, which must be a dotted name
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    validate_host(domain)?;

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
