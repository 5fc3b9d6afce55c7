//! Output module for crawl reports
//!
//! This module handles:
//! - Printing a crawl report to the terminal
//! - Writing a markdown summary of a crawl run

mod markdown;

pub use markdown::{format_markdown_summary, generate_markdown_summary};

use crate::crawler::CrawlReport;
use thiserror::Error;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Number of overflow URLs listed before the rest are elided
pub const OVERFLOW_LISTED: usize = 20;

/// Prints a crawl report to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Seed: {}", report.seed);
    println!(
        "Started: {}  Finished: {}  ({} seconds)",
        report.started_at.to_rfc3339(),
        report.finished_at.to_rfc3339(),
        report.duration_seconds()
    );
    println!();

    println!("Resources:");
    println!("  Pages stored: {}", report.pages);
    println!("  Redirects stored: {}", report.redirects);
    println!("  Raw captures: {}", report.captures);
    println!("  Failed URLs: {}", report.failures);
    println!("  Fetches used: {}", report.fetches);
    println!();

    if !report.overflow.is_empty() {
        println!(
            "Not fetched, over the fetch limit ({}):",
            report.overflow.len()
        );
        for url in report.overflow.iter().take(OVERFLOW_LISTED) {
            println!("  - {}", url);
        }
        if report.overflow.len() > OVERFLOW_LISTED {
            println!("  ... and {} more", report.overflow.len() - OVERFLOW_LISTED);
        }
        println!();
    }
}
