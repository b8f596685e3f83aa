//! robots.txt loading.
//!
//! Only the groups addressed to `*` or to an agent name containing the
//! crawler's token are applied. `Sitemap:` lines are global and collected no
//! matter which group they appear in.
//!
//! ```rust
//! use scout_core::robots::RobotsPolicy;
//!
//! let policy = RobotsPolicy::parse(
//!     "User-agent: *\nDisallow: /admin\nSitemap: https://example.com/sitemap.xml\n",
//!     "scout",
//! );
//! assert!(policy.disallow.contains("/admin"));
//! assert_eq!(policy.sitemaps.len(), 1);
//! ```

use crate::{Error, Result};
use indexmap::IndexSet;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Timeout for the robots.txt request.
pub const ROBOTS_TIMEOUT: Duration = Duration::from_secs(10);

/// Rules from one robots.txt that apply to this crawler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsPolicy {
    /// `Disallow` rules of the relevant groups.
    pub disallow: IndexSet<String>,
    /// `Allow` rules of the relevant groups.
    pub allow: IndexSet<String>,
    /// Smallest `Crawl-delay` of the relevant groups, in seconds.
    pub crawl_delay: Option<f64>,
    /// Every declared sitemap URL.
    pub sitemaps: IndexSet<String>,
}

impl RobotsPolicy {
    /// Parse robots.txt `content` for the crawler identified by `agent_token`.
    #[must_use]
    pub fn parse(content: &str, agent_token: &str) -> Self {
        let token = agent_token.trim().to_ascii_lowercase();
        let mut policy = Self::default();

        let mut relevant = false;
        // Consecutive User-agent lines share one group
        let mut in_agent_block = false;

        for raw in content.lines() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_ascii_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if !in_agent_block {
                        relevant = false;
                        in_agent_block = true;
                    }
                    let agent = value.to_ascii_lowercase();
                    if agent == "*" || (!token.is_empty() && agent.contains(&token)) {
                        relevant = true;
                    }
                }
                "sitemap" => {
                    if !value.is_empty() {
                        policy.sitemaps.insert(value.to_string());
                    }
                }
                "disallow" => {
                    in_agent_block = false;
                    if relevant && !value.is_empty() {
                        policy.disallow.insert(value.to_string());
                    }
                }
                "allow" => {
                    in_agent_block = false;
                    if relevant && !value.is_empty() {
                        policy.allow.insert(value.to_string());
                    }
                }
                "crawl-delay" => {
                    in_agent_block = false;
                    if relevant {
                        if let Ok(delay) = value.parse::<f64>() {
                            policy.crawl_delay =
                                Some(policy.crawl_delay.map_or(delay, |d| d.min(delay)));
                        }
                    }
                }
                _ => in_agent_block = false,
            }
        }

        policy
    }

    /// Resolve declared sitemaps against `origin`, dropping unparseable ones.
    #[must_use]
    pub fn sitemap_urls(&self, origin: &Url) -> IndexSet<String> {
        self.sitemaps
            .iter()
            .filter_map(|s| origin.join(s).ok())
            .map(String::from)
            .collect()
    }
}

/// Fetch and parse `{origin}/robots.txt`.
///
/// Non-2xx responses are reported as [`Error::SourceUnavailable`].
#[instrument(skip(client), fields(origin = %origin))]
pub async fn fetch_robots(
    client: &Client,
    origin: &Url,
    agent_token: &str,
) -> Result<RobotsPolicy> {
    let robots_url = origin.join("/robots.txt")?;
    let response = client
        .get(robots_url.as_str())
        .timeout(ROBOTS_TIMEOUT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::SourceUnavailable {
            url: robots_url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    let policy = RobotsPolicy::parse(&body, agent_token);
    debug!(
        disallow = policy.disallow.len(),
        sitemaps = policy.sitemaps.len(),
        "Parsed robots.txt"
    );
    Ok(policy)
}

/// Like [`fetch_robots`], but any failure yields an empty policy.
pub async fn load_robots(client: &Client, origin: &Url, agent_token: &str) -> RobotsPolicy {
    match fetch_robots(client, origin, agent_token).await {
        Ok(policy) => policy,
        Err(Error::SourceUnavailable { status: 404, .. }) => {
            debug!(origin = %origin, "No robots.txt");
            RobotsPolicy::default()
        }
        Err(e) => {
            warn!(origin = %origin, error = %e, category = e.category(), "robots.txt unavailable");
            RobotsPolicy::default()
        }
    }
}
