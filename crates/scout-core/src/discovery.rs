//! Discovery orchestration.
//!
//! [`discover_routes`] turns a start URL into the bounded set of same-origin
//! pages worth auditing:
//!
//! 1. robots.txt rules and declared sitemaps (when respected)
//! 2. sitemap URLs, returned directly when there are at least `limit` of them
//! 3. the start page's navigation and regular links
//! 4. common paths, when the frontier is still thin
//! 5. a priority-ordered crawl bounded by `limit` and `max_depth`
//!
//! Every I/O step is isolated. A failing source contributes nothing and the
//! run carries on, so the result may be smaller than `limit` or even empty.
//! Callers substitute the start URL for an empty result.

use crate::browser::{BrowserContext, GotoOptions, Page};
use crate::config::CrawlerConfig;
use crate::frontier::{
    CrawlState, PRIORITY_NAVIGATION, PRIORITY_REGULAR, PRIORITY_SITEMAP, PRIORITY_START,
};
use crate::links::{ExtractedLinks, extract_links};
use crate::policy::{UrlFilter, canonicalize, is_crawlable, is_disallowed, is_same_origin};
use crate::probe::{ProbeScope, probe_common_paths};
use crate::robots::load_robots;
use crate::sitemap::SitemapLoader;
use crate::spa::SpaRouteDetector;
use crate::{Error, Result};
use indexmap::IndexSet;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Progress callback. Messages are advisory text.
pub type ProgressFn = dyn Fn(&str) + Send + Sync;

/// The frontier never grows beyond this multiple of `limit`.
pub const FRONTIER_SAFETY_MULTIPLE: usize = 10;

/// Quiet period that counts as network idle after a navigation.
pub const NETWORK_IDLE_TIME: Duration = Duration::from_millis(500);

/// Longest wait for network idle after a navigation.
pub const NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Minimum frontier size below which the common-path probe runs even when
/// navigation links were harvested.
const MIN_PROBE_FRONTIER: usize = 4;

/// Discover the pages to audit for `config.start_url`.
///
/// Never fails. Returns canonical URLs in visit order, at most
/// `config.limit` of them.
pub async fn discover_routes(
    config: &CrawlerConfig,
    browser: &dyn BrowserContext,
    on_progress: Option<&ProgressFn>,
) -> IndexSet<String> {
    match RouteDiscovery::new(config.clone()) {
        Ok(discovery) => discovery.run(browser, on_progress).await,
        Err(e) => {
            warn!(error = %e, "Discovery could not start");
            IndexSet::new()
        }
    }
}

/// One configured discovery run.
#[derive(Debug, Clone)]
pub struct RouteDiscovery {
    config: CrawlerConfig,
    client: Client,
    origin: Url,
    start: String,
    filter: UrlFilter,
}

impl RouteDiscovery {
    /// Validate `config` and build the HTTP client for robots and sitemaps.
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent())
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(Error::Network)?;
        Self::with_client(config, client)
    }

    /// Like [`RouteDiscovery::new`] with a caller-provided client.
    pub fn with_client(config: CrawlerConfig, client: Client) -> Result<Self> {
        config.validate()?;
        let origin = Url::parse(&config.origin())?;
        let start = canonicalize(&origin, config.include_query, config.start_url.as_str())
            .ok_or_else(|| Error::InvalidUrl(config.start_url.to_string()))?;
        let filter = UrlFilter::new(&config.include_patterns, &config.exclude_patterns);
        Ok(Self {
            config,
            client,
            origin,
            start,
            filter,
        })
    }

    /// Canonical start URL.
    #[must_use]
    pub fn start_url(&self) -> &str {
        &self.start
    }

    /// Run the discovery. See [`discover_routes`].
    #[instrument(skip_all, fields(start = %self.start, limit = self.config.limit))]
    pub async fn run(
        &self,
        browser: &dyn BrowserContext,
        on_progress: Option<&ProgressFn>,
    ) -> IndexSet<String> {
        let config = &self.config;
        let mut state = CrawlState::new();
        report(
            on_progress,
            &format!("Discovering pages on {}", self.origin),
        );

        let mut robots_sitemaps = IndexSet::new();
        if config.respect_robots_txt {
            let robots = load_robots(&self.client, &self.origin, &config.user_agent_token).await;
            robots_sitemaps = robots.sitemap_urls(&self.origin);
            state.disallow = robots.disallow;
            debug!(rules = state.disallow.len(), "Robots rules in effect");
        }

        if config.use_sitemap {
            state.sitemap_urls = SitemapLoader::new(self.client.clone())
                .load(&self.origin, config.limit, &robots_sitemaps)
                .await;
            report(
                on_progress,
                &format!("Found {} URLs in sitemaps", state.sitemap_urls.len()),
            );
            if state.sitemap_urls.len() >= config.limit {
                let routes = self.sitemap_routes(&state);
                info!(count = routes.len(), "Using sitemap URLs directly");
                return routes;
            }
        }

        state.enqueue(self.start.clone(), PRIORITY_START, 0);
        let sitemap_urls = std::mem::take(&mut state.sitemap_urls);
        for url in &sitemap_urls {
            if let Some(candidate) = self.admit(url, &state) {
                state.enqueue(candidate, PRIORITY_SITEMAP, 1);
            }
        }
        state.sitemap_urls = sitemap_urls;

        let mut page = match browser.new_page().await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "Could not open a browser page");
                return state.visited;
            }
        };

        let mut spa = if config.detect_spa_routes {
            match SpaRouteDetector::install(page.as_mut(), &self.origin).await {
                Ok(detector) => Some(detector),
                Err(e) => {
                    warn!(error = %e, "SPA route detection unavailable");
                    None
                }
            }
        } else {
            None
        };

        if config.follow_navigation {
            match self.harvest(page.as_mut(), &self.start, spa.as_mut()).await {
                Ok((_, links)) => {
                    let queued = self.enqueue_links(&mut state, &links, 1);
                    report(
                        on_progress,
                        &format!("Queued {queued} links from the start page"),
                    );
                }
                Err(e) => warn!(url = %self.start, error = %e, "Start page navigation failed"),
            }
        }

        let probe_threshold = MIN_PROBE_FRONTIER.max(config.limit / 2);
        if config.discover_common_paths
            && (!config.follow_navigation || state.frontier.len() < probe_threshold)
        {
            report(on_progress, "Probing common paths");
            let scope = ProbeScope {
                origin: &self.origin,
                start_url: &self.start,
                include_query: config.include_query,
                filter: &self.filter,
                limit: config.limit,
            };
            probe_common_paths(page.as_mut(), &mut state, &scope).await;
        }

        self.crawl(page.as_mut(), &mut state, spa.as_mut(), on_progress)
            .await;

        if let Err(e) = page.close().await {
            debug!(error = %e, "Closing page failed");
        }

        info!(visited = state.visited.len(), "Discovery finished");
        state.visited
    }

    /// Main loop: visit candidates in priority order until the frontier is
    /// empty or the page budget is spent.
    async fn crawl(
        &self,
        page: &mut dyn Page,
        state: &mut CrawlState,
        mut spa: Option<&mut SpaRouteDetector>,
        on_progress: Option<&ProgressFn>,
    ) {
        let config = &self.config;

        while state.visited.len() < config.limit {
            let Some(candidate) = state.frontier.pop() else {
                break;
            };
            if candidate.depth > config.max_depth {
                continue;
            }
            let Some(url) = canonicalize(&self.origin, config.include_query, &candidate.url) else {
                continue;
            };
            if state.visited.contains(&url) || !self.permits(&url, state) {
                continue;
            }

            let (landed, links) = match self.harvest(page, &url, spa.as_deref_mut()).await {
                Ok(harvest) => harvest,
                Err(e) => {
                    warn!(url = %url, error = %e, "Skipping page");
                    continue;
                }
            };

            // Same-origin redirects are recorded under the page they land on
            if landed != url {
                if state.visited.contains(&landed) || !self.permits(&landed, state) {
                    debug!(url = %url, landed = %landed, "Redirected to a visited or excluded page");
                    continue;
                }
                state.depth_index.index(&landed, candidate.depth);
            }

            state.visited.insert(landed.clone());
            report(
                on_progress,
                &format!("Visited {}/{}: {landed}", state.visited.len(), config.limit),
            );

            let next_depth = candidate.depth + 1;
            if next_depth <= config.max_depth {
                let queued = self.enqueue_links(state, &links, next_depth);
                debug!(url = %url, found = links.len(), queued, "Harvested links");
            }
        }
    }

    /// Navigate to `url`, then collect its links and any SPA routes fired
    /// since the last drain.
    ///
    /// Returns the canonical landing URL along with the links.
    async fn harvest(
        &self,
        page: &mut dyn Page,
        url: &str,
        spa: Option<&mut SpaRouteDetector>,
    ) -> Result<(String, ExtractedLinks)> {
        let response = page
            .goto(
                url,
                GotoOptions::dom_content_loaded(self.config.navigation_timeout()),
            )
            .await?;

        if !response.is_success() {
            return Err(Error::Navigation {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status),
            });
        }
        if response.content_type.is_some() && !response.is_html() {
            return Err(Error::Navigation {
                url: url.to_string(),
                reason: "not an HTML document".to_string(),
            });
        }
        let landed = Url::parse(&response.url)?;
        if !is_same_origin(&landed, &self.origin) {
            return Err(Error::Navigation {
                url: url.to_string(),
                reason: format!("redirected off-origin to {landed}"),
            });
        }

        let canonical = canonicalize(&self.origin, self.config.include_query, landed.as_str())
            .unwrap_or_else(|| url.to_string());

        page.wait_for_network_idle(NETWORK_IDLE_TIME, NETWORK_IDLE_TIMEOUT)
            .await;

        let mut links = match extract_links(page, &landed, self.config.pierce_shadow_dom).await {
            Ok(links) => links,
            Err(e) => {
                debug!(url, error = %e, "Link extraction failed");
                ExtractedLinks::default()
            }
        };

        if let Some(detector) = spa {
            for route in detector.drain() {
                if !links.regular.contains(&route) {
                    links.regular.push(route);
                }
            }
        }

        Ok((canonical, links))
    }

    /// Queue harvested links at `depth`. Returns how many were queued.
    fn enqueue_links(&self, state: &mut CrawlState, links: &ExtractedLinks, depth: u32) -> usize {
        let cap = self.config.limit.saturating_mul(FRONTIER_SAFETY_MULTIPLE);
        let buckets = [
            (&links.navigation, PRIORITY_NAVIGATION),
            (&links.regular, PRIORITY_REGULAR),
        ];

        let mut queued = 0;
        for (bucket, priority) in buckets {
            for link in bucket {
                if state.frontier.len() >= cap {
                    return queued;
                }
                if let Some(candidate) = self.admit(link, state) {
                    if state.enqueue(candidate, priority, depth) {
                        queued += 1;
                    }
                }
            }
        }
        queued
    }

    /// Canonicalize `raw` and return it when it may be queued.
    fn admit(&self, raw: &str, state: &CrawlState) -> Option<String> {
        let canonical = canonicalize(&self.origin, self.config.include_query, raw)?;
        if state.depth_index.contains(&canonical) || !self.permits(&canonical, state) {
            return None;
        }
        Some(canonical)
    }

    /// Same-origin, crawlable, allowed by robots and by the pattern filter.
    fn permits(&self, canonical: &str, state: &CrawlState) -> bool {
        let Ok(url) = Url::parse(canonical) else {
            return false;
        };
        if !is_same_origin(&url, &self.origin) || !is_crawlable(&url) {
            return false;
        }
        if is_disallowed(canonical, &state.disallow) {
            debug!(url = canonical, "Disallowed by robots.txt");
            return false;
        }
        if !self.filter.allows(&url) {
            debug!(url = canonical, "Excluded by URL patterns");
            return false;
        }
        true
    }

    /// Result for sites whose sitemaps already cover the page budget: the
    /// start URL followed by filtered sitemap entries.
    fn sitemap_routes(&self, state: &CrawlState) -> IndexSet<String> {
        let limit = self.config.limit;
        let mut routes = IndexSet::with_capacity(limit);
        routes.insert(self.start.clone());

        for url in &state.sitemap_urls {
            if routes.len() >= limit {
                break;
            }
            let Some(canonical) = canonicalize(&self.origin, self.config.include_query, url) else {
                continue;
            };
            if self.permits(&canonical, state) {
                routes.insert(canonical);
            }
        }
        routes
    }
}

fn report(on_progress: Option<&ProgressFn>, message: &str) {
    if let Some(callback) = on_progress {
        callback(message);
    }
}
