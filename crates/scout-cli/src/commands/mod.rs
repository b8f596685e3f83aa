//! Command implementations for the scout CLI.

mod discover;
mod robots;
mod sitemap;

pub use discover::execute as discover;
pub use robots::execute as robots;
pub use sitemap::execute as sitemap;

use anyhow::{Context, Result};
use reqwest::Client;
use scout_core::CrawlerConfig;
use url::Url;

use crate::config::FileConfig;

/// Crawler config for `url` with file settings applied.
fn base_config(url: &str, file: &FileConfig) -> Result<CrawlerConfig> {
    let mut config = CrawlerConfig::new(url).with_context(|| format!("Cannot crawl '{url}'"))?;
    file.apply(&mut config);
    Ok(config)
}

/// Origin of the configured start URL.
fn origin_of(config: &CrawlerConfig) -> Result<Url> {
    Url::parse(&config.origin()).context("Start URL has no usable origin")
}

/// HTTP client for robots.txt and sitemap requests.
fn http_client(config: &CrawlerConfig) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent())
        .gzip(true)
        .brotli(true)
        .build()
        .context("Failed to create HTTP client")
}
