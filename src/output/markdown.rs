//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of one crawl run,
//! including resource counts and the URLs left behind by the fetch limit.

use crate::crawler::CrawlReport;
use crate::output::{OutputResult, OVERFLOW_LISTED};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary of a crawl run
///
/// # Arguments
///
/// * `report` - The finished crawl report
/// * `config_hash` - Hash of the site configuration used, if any
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(
    report: &CrawlReport,
    config_hash: Option<&str>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(report, config_hash);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_summary(report: &CrawlReport, config_hash: Option<&str>) -> String {
    let mut md = String::new();

    md.push_str("# Staticator Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", report.seed));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Finished**: {}\n",
        report.finished_at.to_rfc3339()
    ));
    let duration = report.duration_seconds();
    md.push_str(&format!(
        "- **Duration**: {} seconds ({:.2} minutes)\n",
        duration,
        duration as f64 / 60.0
    ));
    if let Some(hash) = config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    md.push_str("## Resources\n\n");
    md.push_str("| Kind | Count |\n");
    md.push_str("|------|-------|\n");
    md.push_str(&format!("| Pages | {} |\n", report.pages));
    md.push_str(&format!("| Redirects | {} |\n", report.redirects));
    md.push_str(&format!("| Raw captures | {} |\n", report.captures));
    md.push_str(&format!("| Failed URLs | {} |\n", report.failures));
    md.push_str(&format!("| Fetches used | {} |\n\n", report.fetches));

    md.push_str(&format!(
        "## Crawled URLs\n\nTotal: {}\n\n",
        report.visited.len()
    ));
    for url in &report.visited {
        md.push_str(&format!("- {}\n", url));
    }
    md.push('\n');

    if !report.overflow.is_empty() {
        md.push_str("## Over the Fetch Limit\n\n");
        md.push_str(&format!("Total: {}\n\n", report.overflow.len()));
        for url in report.overflow.iter().take(OVERFLOW_LISTED) {
            md.push_str(&format!("- {}\n", url));
        }
        if report.overflow.len() > OVERFLOW_LISTED {
            md.push_str(&format!(
                "\n... and {} more\n",
                report.overflow.len() - OVERFLOW_LISTED
            ));
        }
        md.push('\n');
    }

    md
}
