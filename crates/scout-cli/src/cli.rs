//! # CLI Structure and Argument Parsing
//!
//! ```bash
//! # Discover up to 50 pages
//! scout discover https://example.com
//!
//! # Tighter budget, skip the blog, JSON for scripts
//! scout discover https://example.com --limit 10 --exclude '/blog/**' --format json
//!
//! # Inspect the individual sources
//! scout robots https://example.com
//! scout sitemap https://example.com --limit 100
//! ```
//!
//! Options given on the command line override the config file, which
//! overrides the built-in defaults.

use clap::{Args, Parser, Subcommand};
use scout_core::CrawlerConfig;
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Main CLI structure for the `scout` command
#[derive(Parser, Clone, Debug)]
#[command(name = "scout")]
#[command(version)]
#[command(about = "Discover the pages of a site worth auditing", long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print results and errors
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file
    #[arg(long, global = true, env = "SCOUT_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Discover same-origin pages starting from a URL
    Discover(DiscoverArgs),

    /// Show the robots.txt rules that apply to scout
    Robots {
        /// Any URL on the site
        url: String,

        /// Crawler token matched against User-agent lines
        #[arg(long, value_name = "TOKEN")]
        user_agent_token: Option<String>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the page URLs found in the site's sitemaps
    Sitemap {
        /// Any URL on the site
        url: String,

        /// Page budget; loading stops after twice this many URLs
        #[arg(short = 'l', long, value_name = "N")]
        limit: Option<usize>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl Commands {
    /// Output format selected for the command.
    pub const fn format(&self) -> OutputFormat {
        match self {
            Self::Discover(args) => args.format,
            Self::Robots { format, .. } | Self::Sitemap { format, .. } => *format,
        }
    }
}

/// Arguments of `scout discover`
#[derive(Args, Clone, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct DiscoverArgs {
    /// Start URL
    pub url: String,

    /// Maximum number of pages to return
    #[arg(short = 'l', long, value_name = "N")]
    pub limit: Option<usize>,

    /// Maximum link depth from the start URL
    #[arg(short = 'd', long, value_name = "N")]
    pub max_depth: Option<u32>,

    /// Per-navigation timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Only crawl URLs matching this glob (repeatable)
    #[arg(short = 'i', long = "include", value_name = "GLOB")]
    pub include: Vec<String>,

    /// Never crawl URLs matching this glob (repeatable, wins over --include)
    #[arg(short = 'x', long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Keep query strings when comparing URLs
    #[arg(long)]
    pub include_query: bool,

    /// Do not read sitemaps
    #[arg(long)]
    pub no_sitemap: bool,

    /// Ignore robots.txt
    #[arg(long)]
    pub ignore_robots: bool,

    /// Do not capture History API route changes
    #[arg(long)]
    pub no_spa: bool,

    /// Do not look inside shadow roots
    #[arg(long)]
    pub no_shadow_dom: bool,

    /// Do not probe conventional paths like /about
    #[arg(long)]
    pub no_common_paths: bool,

    /// Do not harvest the start page before crawling
    #[arg(long)]
    pub no_follow_navigation: bool,

    /// Crawler token matched against robots.txt User-agent lines
    #[arg(long, value_name = "TOKEN")]
    pub user_agent_token: Option<String>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl DiscoverArgs {
    /// Apply command-line overrides on top of `config`.
    pub fn apply(&self, config: &mut CrawlerConfig) {
        if let Some(limit) = self.limit {
            config.limit = limit;
        }
        if let Some(depth) = self.max_depth {
            config.max_depth = depth;
        }
        if let Some(timeout) = self.timeout_ms {
            config.timeout_ms = timeout;
        }
        if !self.include.is_empty() {
            config.include_patterns.clone_from(&self.include);
        }
        config.exclude_patterns.extend(self.exclude.iter().cloned());
        if self.include_query {
            config.include_query = true;
        }
        if self.no_sitemap {
            config.use_sitemap = false;
        }
        if self.ignore_robots {
            config.respect_robots_txt = false;
        }
        if self.no_spa {
            config.detect_spa_routes = false;
        }
        if self.no_shadow_dom {
            config.pierce_shadow_dom = false;
        }
        if self.no_common_paths {
            config.discover_common_paths = false;
        }
        if self.no_follow_navigation {
            config.follow_navigation = false;
        }
        if let Some(token) = &self.user_agent_token {
            config.user_agent_token.clone_from(token);
        }
    }
}
