//! `scout sitemap`

use anyhow::{Context, Result};
use colored::Colorize;
use indexmap::IndexSet;
use scout_core::SitemapLoader;
use scout_core::robots::load_robots;
use serde::Serialize;

use super::{base_config, http_client, origin_of};
use crate::config::FileConfig;
use crate::output::{OutputFormat, print_json};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SitemapReport<'a> {
    origin: &'a str,
    count: usize,
    urls: &'a IndexSet<String>,
}

pub async fn execute(
    url: &str,
    limit: Option<usize>,
    file: &FileConfig,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let mut config = base_config(url, file)?;
    if let Some(limit) = limit {
        config.limit = limit;
    }
    config.validate().context("Invalid crawler options")?;

    let origin = origin_of(&config)?;
    let client = http_client(&config)?;

    let robots_sitemaps = if config.respect_robots_txt {
        load_robots(&client, &origin, &config.user_agent_token)
            .await
            .sitemap_urls(&origin)
    } else {
        IndexSet::new()
    };

    let urls = SitemapLoader::new(client)
        .load(&origin, config.limit, &robots_sitemaps)
        .await;

    if format.is_machine() {
        return print_json(&SitemapReport {
            origin: &config.origin(),
            count: urls.len(),
            urls: &urls,
        });
    }

    for url in &urls {
        println!("{url}");
    }
    if !quiet {
        if urls.is_empty() {
            eprintln!("{}", "No sitemap URLs found".yellow());
        } else {
            eprintln!("{} {} URLs from sitemaps", "✓".green(), urls.len());
        }
    }
    Ok(())
}
