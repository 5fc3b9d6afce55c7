use crate::config::types::SiteConfig;
use crate::config::validation::validate_site;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a site configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML site configuration file
///
/// # Returns
///
/// * `Ok(SiteConfig)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use staticator::config::load_site_config;
///
/// let site = load_site_config(Path::new("site.toml")).unwrap();
/// println!("Archiving {}", site.name);
/// ```
pub fn load_site_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_site_config(&content)
}

/// Parses and validates site configuration text
pub fn parse_site_config(content: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = toml::from_str(content)?;
    validate_site(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged with every run so archives can be traced back to the
/// configuration they were made with.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a site configuration and returns both the config and its hash
pub fn load_site_config_with_hash(path: &Path) -> Result<(SiteConfig, String), ConfigError> {
    let config = load_site_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
