//! Logging setup shared by the archiver and the archive server

use tracing_subscriber::EnvFilter;

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` is ignored; verbosity comes from the command line only.
pub fn setup_logging(verbose: u8, quiet: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose, quiet))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn filter_for(verbose: u8, quiet: bool) -> EnvFilter {
    if quiet {
        // Only show errors
        return EnvFilter::new("error");
    }

    match verbose {
        0 => EnvFilter::new("staticator=info,warn"),
        1 => EnvFilter::new("staticator=debug,info"),
        2 => EnvFilter::new("staticator=trace,debug"),
        _ => EnvFilter::new("trace"),
    }
}
