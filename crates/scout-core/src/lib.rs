//! # scout-core
//!
//! Bounded page discovery for site audits.
//!
//! Given a start URL, scout decides which same-origin pages an audit should
//! cover. It fuses several independent sources into one priority-ordered,
//! depth-bounded traversal:
//!
//! - **Robots**: `Disallow` rules and declared sitemaps from robots.txt
//! - **Sitemaps**: nested sitemap indexes flattened into page URLs
//! - **Links**: navigation and regular links harvested from rendered pages,
//!   shadow roots included
//! - **Common paths**: speculative visits to `/about`, `/contact`, ...
//! - **SPA routes**: History API route changes captured while pages are open
//!
//! The audit stage's cost grows with every page returned, so the result never
//! exceeds the configured `limit`, and no per-page failure ever aborts a run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use scout_core::{CrawlerConfig, HttpBrowser, discover_routes};
//!
//! # async fn example() -> scout_core::Result<()> {
//! let mut config = CrawlerConfig::new("https://example.com")?;
//! config.limit = 20;
//!
//! let browser = HttpBrowser::new(&config.user_agent())?;
//! let routes = discover_routes(&config, &browser, Some(&|msg: &str| eprintln!("{msg}"))).await;
//! for url in &routes {
//!     println!("{url}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Browsers
//!
//! Discovery drives a [`BrowserContext`]. The bundled [`HttpBrowser`] fetches
//! server HTML without running scripts. Implement [`BrowserContext`] and
//! [`Page`] over a headless browser to get client-rendered links, shadow DOM
//! piercing and SPA route detection.

/// Browser capability traits and the HTTP renderer
pub mod browser;
/// Crawl configuration
pub mod config;
/// Discovery orchestration
pub mod discovery;
/// Error types and result aliases
pub mod error;
/// Frontier, depth index and crawl state
pub mod frontier;
/// Link harvesting from rendered pages
pub mod links;
/// URL canonicalization and filtering
pub mod policy;
/// Common-path probing
pub mod probe;
/// robots.txt loading
pub mod robots;
/// Sitemap discovery
pub mod sitemap;
/// History API route detection
pub mod spa;

// Re-export commonly used types
pub use browser::http::HttpBrowser;
pub use browser::{BrowserContext, GotoOptions, Page, PageResponse, WaitUntil};
pub use config::CrawlerConfig;
pub use discovery::{ProgressFn, RouteDiscovery, discover_routes};
pub use error::{Error, Result};
pub use frontier::{Candidate, CrawlState, DepthIndex, Frontier};
pub use links::ExtractedLinks;
pub use robots::RobotsPolicy;
pub use sitemap::SitemapLoader;
