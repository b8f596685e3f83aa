//! Crawl configuration.
//!
//! A [`CrawlerConfig`] is built once per discovery run and read-only
//! afterwards. Field names serialize in camelCase so JSON and TOML files can
//! use the same names as the rest of the audit pipeline (`useSitemap`,
//! `maxDepth`, ...).
//!
//! ```rust
//! use scout_core::CrawlerConfig;
//!
//! let mut config = CrawlerConfig::new("https://example.com")?;
//! config.limit = 10;
//! config.exclude_patterns.push("/blog/**".to_string());
//! config.validate()?;
//! # Ok::<(), scout_core::Error>(())
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default maximum number of pages returned by a discovery run.
pub const DEFAULT_LIMIT: usize = 50;

/// Default per-navigation timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default maximum link depth from the start URL.
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Default identifier token matched against robots.txt `User-agent` lines.
pub const DEFAULT_USER_AGENT_TOKEN: &str = "scout";

/// Configuration for a single discovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct CrawlerConfig {
    /// Page the crawl starts from. Its origin bounds the crawl.
    pub start_url: Url,

    /// Maximum number of pages to return.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Per-navigation timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Seed the crawl from sitemap.xml files.
    #[serde(default = "default_true")]
    pub use_sitemap: bool,

    /// Fetch robots.txt and never visit disallowed paths.
    #[serde(default = "default_true")]
    pub respect_robots_txt: bool,

    /// Capture History API route changes while pages are open.
    #[serde(default = "default_true")]
    pub detect_spa_routes: bool,

    /// Harvest links inside open shadow roots.
    #[serde(default = "default_true")]
    pub pierce_shadow_dom: bool,

    /// Allow-list globs. Empty means every URL is allowed.
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Deny-list globs. Exclusion wins over inclusion.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Probe conventional paths such as `/about` and `/contact`.
    #[serde(default = "default_true")]
    pub discover_common_paths: bool,

    /// Harvest the start page's navigation before the main loop.
    #[serde(default = "default_true")]
    pub follow_navigation: bool,

    /// Maximum link depth from the start URL.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Keep query strings when canonicalizing URLs.
    #[serde(default)]
    pub include_query: bool,

    /// Crawler identifier used for robots.txt sections and the user agent.
    #[serde(default = "default_user_agent_token")]
    pub user_agent_token: String,
}

const fn default_limit() -> usize {
    DEFAULT_LIMIT
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

const fn default_true() -> bool {
    true
}

const fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_user_agent_token() -> String {
    DEFAULT_USER_AGENT_TOKEN.to_string()
}

impl CrawlerConfig {
    /// Create a configuration with default options for `start_url`.
    ///
    /// Only `http` and `https` URLs are accepted.
    pub fn new(start_url: &str) -> Result<Self> {
        let start_url = parse_start_url(start_url)?;
        Ok(Self {
            start_url,
            limit: DEFAULT_LIMIT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            use_sitemap: true,
            respect_robots_txt: true,
            detect_spa_routes: true,
            pierce_shadow_dom: true,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            discover_common_paths: true,
            follow_navigation: true,
            max_depth: DEFAULT_MAX_DEPTH,
            include_query: false,
            user_agent_token: DEFAULT_USER_AGENT_TOKEN.to_string(),
        })
    }

    /// Check option ranges that the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(Error::Config("limit must be at least 1".into()));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config("timeoutMs must be greater than zero".into()));
        }
        if self.user_agent_token.trim().is_empty() {
            return Err(Error::Config("userAgentToken must not be empty".into()));
        }
        if !matches!(self.start_url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "unsupported scheme '{}'",
                self.start_url.scheme()
            )));
        }
        Ok(())
    }

    /// Per-navigation timeout as a [`Duration`].
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Origin of the start URL, e.g. `https://example.com`.
    #[must_use]
    pub fn origin(&self) -> String {
        self.start_url.origin().ascii_serialization()
    }

    /// User agent sent with robots.txt and sitemap requests.
    #[must_use]
    pub fn user_agent(&self) -> String {
        format!(
            "Mozilla/5.0 (compatible; {}/{})",
            self.user_agent_token,
            env!("CARGO_PKG_VERSION")
        )
    }
}

fn parse_start_url(input: &str) -> Result<Url> {
    let url = Url::parse(input.trim()).map_err(|e| Error::InvalidUrl(format!("'{input}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::InvalidUrl(format!(
            "'{input}': only http(s) URLs with a host can be crawled"
        )));
    }
    Ok(url)
}
