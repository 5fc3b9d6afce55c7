//! Staticator main entry point
//!
//! This is the command-line interface for the Staticator site archiver.

use clap::Parser;
use staticator::config::{load_site_config_with_hash, CrawlerConfig, HeadLinkMode, SiteConfig};
use staticator::crawler::{crawl, crawl_new_resource};
use staticator::logging::setup_logging;
use staticator::output::{generate_markdown_summary, print_report};
use staticator::storage::{open_store, Store};
use staticator::url::normalize_url;
use staticator::StaticatorError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Staticator: archives a dynamic website as a static copy
///
/// Staticator crawls a site from a seed URL, rewrites every same-site link to
/// a root-relative one, and stores each page and redirect in a database that
/// `staticator-serve` can replay.
#[derive(Parser, Debug)]
#[command(name = "staticator")]
#[command(version)]
#[command(about = "Archive a website as a static, link-relative copy", long_about = None)]
struct Cli {
    /// Store target: sqlite:<file>[:<bucket>] or memory:
    #[arg(long, value_name = "SCHEME:PATH")]
    db: String,

    /// Site configuration file (TOML) describing resource path patterns
    #[arg(long, value_name = "FILE")]
    site: Option<PathBuf>,

    /// Root URL to crawl from
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Comma-separated list of extra hosts to treat as local
    #[arg(long, value_delimiter = ',')]
    domains: Vec<String>,

    /// URL of a newly created resource to fetch (requires --site)
    #[arg(long, value_name = "URL", requires = "site")]
    new_resource: Option<String>,

    /// URL of an updated resource to fetch
    #[arg(long, value_name = "URL")]
    update_resource: Option<String>,

    /// URL of a resource to remove from the archive
    #[arg(long, value_name = "URL")]
    delete_resource: Option<String>,

    /// Maximum number of URLs to fetch
    #[arg(long, default_value_t = 1)]
    limit: usize,

    /// Maximum number of concurrent fetches
    #[arg(long, default_value_t = 1)]
    parallel: usize,

    /// What to do with <link> references in the document head
    #[arg(long, default_value_t = HeadLinkMode::Relativize)]
    head_links: HeadLinkMode,

    /// User agent sent with every request
    #[arg(long)]
    user_agent: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Count 4xx/5xx responses as failures instead of archiving them
    #[arg(long)]
    skip_error_pages: bool,

    /// Write a markdown summary of the crawl to this file
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let site = match &cli.site {
        Some(path) => Some(load_site(path)?),
        None => None,
    };

    let store = match open_store(&cli.db) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store {}: {}", cli.db, e);
            return Err(e.into());
        }
    };

    let outcome = run_action(&cli, site.as_ref(), store.clone()).await;

    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
        outcome?;
        return Err(e.into());
    }

    outcome
}

/// Loads the site configuration and logs what was loaded
fn load_site(path: &Path) -> Result<(SiteConfig, String), Box<dyn std::error::Error>> {
    tracing::info!("Loading site configuration from: {}", path.display());
    match load_site_config_with_hash(path) {
        Ok((site, hash)) => {
            tracing::info!(
                "Site configuration for {:?} loaded (hash: {}): {} domains, {} resource types",
                site.name,
                hash,
                site.domains.len(),
                site.resources.len()
            );
            Ok((site, hash))
        }
        Err(e) => {
            tracing::error!("Failed to load site configuration: {}", e);
            Err(e.into())
        }
    }
}

/// Runs whichever action the flags ask for
async fn run_action(
    cli: &Cli,
    site: Option<&(SiteConfig, String)>,
    store: Arc<dyn Store>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(seed) = &cli.url {
        let config = crawler_config(cli, seed)?;
        return handle_crawl(cli, config, site.map(|(_, hash)| hash.as_str()), store).await;
    }

    if let Some(resource) = &cli.new_resource {
        let (site, _) = site.ok_or("--new-resource requires --site")?;
        return crawl_new_resource(resource, site).map_err(Into::into);
    }

    if cli.update_resource.is_some() {
        return Err(StaticatorError::NotImplemented("updating resources".to_string()).into());
    }

    if cli.delete_resource.is_some() {
        return Err(StaticatorError::NotImplemented("deleting resources".to_string()).into());
    }

    Err(
        "Nothing to do. Please specify --url or one of the --<new|update|delete>-resource flags"
            .into(),
    )
}

/// Builds the crawl settings from the command line
fn crawler_config(cli: &Cli, seed: &str) -> Result<CrawlerConfig, StaticatorError> {
    let mut config = CrawlerConfig::new(normalize_url(seed)?);
    config.fetch_limit = cli.limit;
    config.max_parallel = cli.parallel;
    config.aliases = cli
        .domains
        .iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect();
    config.head_links = cli.head_links;
    if let Some(user_agent) = &cli.user_agent {
        config.user_agent = user_agent.clone();
    }
    config.request_timeout = Duration::from_secs(cli.timeout_secs);
    config.accept_invalid_certs = cli.insecure;
    config.store_error_pages = !cli.skip_error_pages;
    Ok(config)
}

/// Handles the main crawl operation
async fn handle_crawl(
    cli: &Cli,
    config: CrawlerConfig,
    config_hash: Option<&str>,
    store: Arc<dyn Store>,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = match crawl(config, store).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    if !cli.quiet {
        print_report(&report);
    }

    if let Some(path) = &cli.summary {
        generate_markdown_summary(&report, config_hash, path)?;
        tracing::info!("Summary written to: {}", path.display());
    }

    Ok(())
}
