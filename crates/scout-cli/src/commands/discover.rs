//! `scout discover`

use anyhow::{Context, Result};
use colored::Colorize;
use scout_core::policy::canonicalize;
use scout_core::{CrawlerConfig, HttpBrowser, ProgressFn, discover_routes};
use serde::Serialize;
use std::time::Instant;
use tracing::warn;

use super::{base_config, origin_of};
use crate::cli::DiscoverArgs;
use crate::config::FileConfig;
use crate::utils::progress::Progress;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscoverReport<'a> {
    start_url: &'a str,
    count: usize,
    /// The run found nothing and the start URL was substituted.
    fallback: bool,
    elapsed_ms: u128,
    routes: Vec<&'a str>,
}

/// Build the crawler config: defaults, then the file, then flags.
pub fn build_config(args: &DiscoverArgs, file: &FileConfig) -> Result<CrawlerConfig> {
    let mut config = base_config(&args.url, file)?;
    args.apply(&mut config);
    config.validate().context("Invalid crawler options")?;
    Ok(config)
}

pub async fn execute(args: &DiscoverArgs, file: &FileConfig, quiet: bool) -> Result<()> {
    let config = build_config(args, file)?;
    let origin = origin_of(&config)?;
    let start = canonicalize(&origin, config.include_query, config.start_url.as_str())
        .unwrap_or_else(|| config.start_url.to_string());

    let browser = HttpBrowser::new(&config.user_agent()).context("Failed to create HTTP client")?;

    let progress = Progress::new(!quiet && !args.format.is_machine());
    let reporter = progress.clone();
    let on_message = move |message: &str| reporter.report(message);
    let on_progress: Option<&ProgressFn> = if progress.is_enabled() {
        Some(&on_message)
    } else {
        None
    };

    let started = Instant::now();
    let mut routes = discover_routes(&config, &browser, on_progress).await;
    progress.finish();
    let elapsed = started.elapsed();

    let fallback = routes.is_empty();
    if fallback {
        warn!(start = %start, "No pages discovered, falling back to the start URL");
        routes.insert(start.clone());
    }

    if args.format.is_machine() {
        let report = DiscoverReport {
            start_url: &start,
            count: routes.len(),
            fallback,
            elapsed_ms: elapsed.as_millis(),
            routes: routes.iter().map(String::as_str).collect(),
        };
        return crate::output::print_json(&report);
    }

    for route in &routes {
        println!("{route}");
    }
    if !quiet {
        let summary = format!(
            "Discovered {} page{} in {:.1}s",
            routes.len(),
            if routes.len() == 1 { "" } else { "s" },
            elapsed.as_secs_f64()
        );
        eprintln!("{} {summary}", "✓".green());
        if fallback {
            eprintln!(
                "{}",
                "Nothing was reachable besides the start URL; auditing it alone".yellow()
            );
        }
    }
    Ok(())
}
