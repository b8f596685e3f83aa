//! `scout robots`

use anyhow::Result;
use colored::Colorize;
use scout_core::Error;
use scout_core::robots::{RobotsPolicy, fetch_robots};
use serde::Serialize;

use super::{base_config, http_client, origin_of};
use crate::config::FileConfig;
use crate::output::{OutputFormat, print_json};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RobotsReport<'a> {
    robots_url: String,
    user_agent_token: &'a str,
    found: bool,
    #[serde(flatten)]
    policy: &'a RobotsPolicy,
}

pub async fn execute(
    url: &str,
    user_agent_token: Option<&str>,
    file: &FileConfig,
    format: OutputFormat,
) -> Result<()> {
    let mut config = base_config(url, file)?;
    if let Some(token) = user_agent_token {
        config.user_agent_token = token.to_string();
    }
    let origin = origin_of(&config)?;
    let client = http_client(&config)?;

    let (policy, found) = match fetch_robots(&client, &origin, &config.user_agent_token).await {
        Ok(policy) => (policy, true),
        Err(Error::SourceUnavailable { .. }) => (RobotsPolicy::default(), false),
        Err(e) => return Err(e.into()),
    };

    let robots_url = origin.join("/robots.txt")?.to_string();
    if format.is_machine() {
        return print_json(&RobotsReport {
            robots_url,
            user_agent_token: &config.user_agent_token,
            found,
            policy: &policy,
        });
    }

    if !found {
        println!("{} {robots_url}", "No robots.txt at".yellow());
        return Ok(());
    }

    println!("{} {}", "Rules for".bold(), config.user_agent_token.cyan());
    print_section("Disallow", policy.disallow.iter());
    print_section("Allow", policy.allow.iter());
    if let Some(delay) = policy.crawl_delay {
        println!("\n{} {delay}s", "Crawl-delay:".bold());
    }
    print_section("Sitemaps", policy.sitemaps.iter());
    Ok(())
}

fn print_section<'a>(title: &str, items: impl ExactSizeIterator<Item = &'a String>) {
    println!("\n{} ({})", title.bold(), items.len());
    for item in items {
        println!("  {item}");
    }
}
