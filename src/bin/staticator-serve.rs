//! Staticator archive server
//!
//! Replays an archived site: assets from disk, everything else from the
//! archive database.

use anyhow::{Context, Result};
use clap::Parser;
use staticator::logging::setup_logging;
use staticator::server::{serve, ServerConfig, DEFAULT_ASSET_PATHS, DEFAULT_PORT};
use staticator::storage::DEFAULT_BUCKET;
use std::path::PathBuf;

/// Serves an archive written by `staticator`
#[derive(Parser, Debug)]
#[command(name = "staticator-serve")]
#[command(version)]
#[command(about = "Serve an archived site", long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory asset paths are served from
    #[arg(long, value_name = "DIR", default_value = "/var/www/html")]
    asset_root: PathBuf,

    /// Path prefixes served from the asset root (comma separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = DEFAULT_ASSET_PATHS.iter().map(|p| p.to_string()).collect::<Vec<_>>()
    )]
    asset_paths: Vec<String>,

    /// Archive database file
    #[arg(long, value_name = "FILE")]
    db: PathBuf,

    /// Bucket within the archive database
    #[arg(long, default_value = DEFAULT_BUCKET)]
    bucket: String,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!(
        "Serving assets under {}: {}",
        cli.asset_root.display(),
        cli.asset_paths.join(", ")
    );

    let config = ServerConfig {
        asset_root: cli.asset_root,
        asset_paths: cli.asset_paths,
        db: cli.db.clone(),
        bucket: cli.bucket,
    };

    serve(config, cli.port)
        .await
        .with_context(|| format!("serving archive {}", cli.db.display()))
}
