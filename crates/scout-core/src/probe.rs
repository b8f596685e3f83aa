//! Common-path probing.
//!
//! Many pages worth auditing (`/contact`, `/privacy`, `/login`, ...) are
//! linked from nowhere a crawler can see. The probe navigates to a fixed
//! catalog of conventional paths and keeps the ones that render a real HTML
//! page.
//!
//! A probe hit must:
//!
//! 1. answer 2xx with a `text/html` content type
//! 2. land on a same-origin URL after redirects
//! 3. not canonicalize to the start URL (sites that send unknown paths home)
//! 4. not be indexed already, disallowed or pattern-excluded
//! 5. not read like a "page not found" page (soft 404)
//!
//! Probing stops after `min(limit, 25)` hits or once the frontier holds
//! `2 * limit` candidates.

use crate::browser::{GotoOptions, Page};
use crate::frontier::{CrawlState, PRIORITY_PROBE};
use crate::policy::{UrlFilter, canonicalize, is_disallowed, is_same_origin};
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Timeout for each probe navigation.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Depth assigned to probe hits.
pub const PROBE_DEPTH: u32 = 2;

/// Upper bound on probe hits regardless of `limit`.
pub const MAX_PROBE_HITS: usize = 25;

/// Bodies shorter than this (visible characters) are checked for not-found text.
const SHORT_BODY_CHARS: usize = 1000;

/// Conventional paths probed in order.
pub const COMMON_PATHS: &[&str] = &[
    // Company
    "/about",
    "/about-us",
    "/company",
    "/team",
    "/our-team",
    "/careers",
    "/jobs",
    "/press",
    "/news",
    "/media",
    "/partners",
    "/investors",
    "/mission",
    "/history",
    // Contact and support
    "/contact",
    "/contact-us",
    "/support",
    "/help",
    "/faq",
    "/faqs",
    "/feedback",
    "/locations",
    "/directions",
    "/hours",
    // Legal and accessibility
    "/privacy",
    "/privacy-policy",
    "/terms",
    "/terms-of-service",
    "/terms-and-conditions",
    "/legal",
    "/cookies",
    "/cookie-policy",
    "/accessibility",
    "/accessibility-statement",
    "/disclaimer",
    "/sitemap",
    // Accounts
    "/login",
    "/signin",
    "/sign-in",
    "/signup",
    "/sign-up",
    "/register",
    "/account",
    "/my-account",
    "/profile",
    "/dashboard",
    "/forgot-password",
    // Commerce
    "/shop",
    "/store",
    "/products",
    "/pricing",
    "/plans",
    "/cart",
    "/checkout",
    "/catalog",
    "/collections",
    "/deals",
    "/gift-cards",
    "/shipping",
    "/returns",
    // Content
    "/blog",
    "/articles",
    "/resources",
    "/events",
    "/calendar",
    "/gallery",
    "/portfolio",
    "/services",
    "/solutions",
    "/features",
    "/testimonials",
    "/reviews",
    "/case-studies",
    "/docs",
    "/documentation",
    "/search",
    // Non-profit
    "/donate",
    "/give",
    "/volunteer",
    "/membership",
    "/get-involved",
    "/programs",
];

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static NOT_FOUND_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b404\b|not found|does(?: not|n't) exist|no longer (?:exists|available)|(?:could not|couldn't|can't|cannot) (?:be )?found|(?:could not|couldn't|can't|cannot) find|nothing (?:was )?found",
    )
    .unwrap()
});

/// SAFETY: Selector is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());

/// SAFETY: Selector is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());

/// SAFETY: Selector is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Inputs of a probe run that do not change while it runs.
#[derive(Debug, Clone, Copy)]
pub struct ProbeScope<'a> {
    /// Origin the probed paths are resolved against.
    pub origin: &'a Url,
    /// Canonical start URL. Probe hits equal to it are rejected.
    pub start_url: &'a str,
    /// Keep query strings when canonicalizing.
    pub include_query: bool,
    /// Include/exclude globs.
    pub filter: &'a UrlFilter,
    /// Page budget of the whole crawl.
    pub limit: usize,
}

impl ProbeScope<'_> {
    fn max_hits(&self) -> usize {
        self.limit.min(MAX_PROBE_HITS)
    }

    fn max_frontier(&self) -> usize {
        self.limit.saturating_mul(2)
    }
}

/// Probe [`COMMON_PATHS`] with `page` and queue every hit in `state`.
///
/// Returns the number of queued pages. Failures are per path and never stop
/// the probe.
#[instrument(skip_all, fields(origin = %scope.origin))]
pub async fn probe_common_paths(
    page: &mut dyn Page,
    state: &mut CrawlState,
    scope: &ProbeScope<'_>,
) -> usize {
    let mut hits = 0;

    for path in COMMON_PATHS {
        if hits >= scope.max_hits() || state.frontier.len() >= scope.max_frontier() {
            break;
        }

        let Some(candidate) = canonicalize(scope.origin, scope.include_query, path) else {
            continue;
        };
        if state.depth_index.contains(&candidate) || is_disallowed(&candidate, &state.disallow) {
            continue;
        }

        if let Some(found) = probe_path(page, state, scope, &candidate).await {
            debug!(path, url = %found, "Probe hit");
            if state.enqueue(found, PRIORITY_PROBE, PROBE_DEPTH) {
                hits += 1;
            }
        }
    }

    info!(hits, "Common-path probe finished");
    hits
}

/// Navigate to `candidate` and return the canonical landing URL if it is a
/// real, new page.
async fn probe_path(
    page: &mut dyn Page,
    state: &CrawlState,
    scope: &ProbeScope<'_>,
    candidate: &str,
) -> Option<String> {
    let response = match page
        .goto(candidate, GotoOptions::dom_content_loaded(PROBE_TIMEOUT))
        .await
    {
        Ok(response) => response,
        Err(e) => {
            debug!(url = candidate, error = %e, "Probe navigation failed");
            return None;
        }
    };

    if !response.is_success() || !response.is_html() {
        return None;
    }

    let landed = Url::parse(&response.url).ok()?;
    if !is_same_origin(&landed, scope.origin) {
        return None;
    }
    let canonical = canonicalize(scope.origin, scope.include_query, landed.as_str())?;
    if canonical == scope.start_url
        || state.depth_index.contains(&canonical)
        || is_disallowed(&canonical, &state.disallow)
    {
        return None;
    }
    let canonical_url = Url::parse(&canonical).ok()?;
    if !scope.filter.allows(&canonical_url) {
        return None;
    }

    let html = page.content().await.ok()?;
    if looks_like_soft_404(&html) {
        debug!(url = %canonical, "Rejected soft 404");
        return None;
    }

    Some(canonical)
}

/// Heuristic for 200 responses that are really "page not found" pages.
///
/// Checks the `<title>`, every `<h1>` and, for short pages, the visible body
/// text for not-found phrasing.
#[must_use]
pub fn looks_like_soft_404(html: &str) -> bool {
    let document = Html::parse_document(html);

    let title: String = document.select(&TITLE).flat_map(|t| t.text()).collect();
    if NOT_FOUND_TEXT.is_match(&title) {
        return true;
    }

    if document
        .select(&H1)
        .any(|h| NOT_FOUND_TEXT.is_match(&h.text().collect::<String>()))
    {
        return true;
    }

    let Some(body) = document.select(&BODY).next() else {
        return false;
    };
    let text = visible_text(body);
    text.chars().count() < SHORT_BODY_CHARS && NOT_FOUND_TEXT.is_match(&text)
}

/// Text of `root` without script, style and template contents.
fn visible_text(root: scraper::ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name().to_string()))
            .is_some_and(|name| {
                matches!(name.as_str(), "script" | "style" | "noscript" | "template")
            });
        if !hidden {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(trimmed);
            }
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::browser::PageResponse;
    use crate::frontier::PRIORITY_REGULAR;
    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::mpsc::UnboundedSender;

    /// Every path renders a distinct real page.
    #[derive(Default)]
    struct LiveSite {
        visits: Vec<String>,
        current: String,
    }

    #[async_trait]
    impl Page for LiveSite {
        async fn goto(&mut self, url: &str, _options: GotoOptions) -> crate::Result<PageResponse> {
            self.visits.push(url.to_string());
            self.current = url.to_string();
            Ok(PageResponse {
                status: 200,
                url: url.to_string(),
                content_type: Some("text/html".to_string()),
            })
        }

        async fn wait_for_network_idle(&mut self, _idle: Duration, _timeout: Duration) {}

        async fn content(&mut self) -> crate::Result<String> {
            Ok(format!(
                "<html><head><title>{0}</title></head><body><h1>{0}</h1></body></html>",
                self.current
            ))
        }

        async fn evaluate(&mut self, _script: &str, _args: Vec<Value>) -> crate::Result<Value> {
            Ok(Value::Null)
        }

        async fn expose_function(
            &mut self,
            _name: &str,
            _sender: UnboundedSender<String>,
        ) -> crate::Result<()> {
            Ok(())
        }

        async fn evaluate_on_new_document(&mut self, _script: &str) -> crate::Result<()> {
            Ok(())
        }

        async fn close(&mut self) -> crate::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_probe_stops_at_hit_cap() {
        let origin = Url::parse("https://example.com").unwrap();
        let filter = UrlFilter::default();
        let scope = ProbeScope {
            origin: &origin,
            start_url: "https://example.com/",
            include_query: false,
            filter: &filter,
            limit: 2,
        };
        let mut page = LiveSite::default();
        let mut state = CrawlState::new();

        let hits = probe_common_paths(&mut page, &mut state, &scope).await;

        assert_eq!(hits, 2);
        assert_eq!(
            page.visits,
            vec!["https://example.com/about", "https://example.com/about-us"]
        );
        assert_eq!(state.frontier.len(), 2);
        while let Some(candidate) = state.frontier.pop() {
            assert_eq!(candidate.priority, PRIORITY_PROBE);
            assert_eq!(candidate.depth, PROBE_DEPTH);
        }
    }

    #[tokio::test]
    async fn test_probe_stops_at_frontier_budget() {
        let origin = Url::parse("https://example.com").unwrap();
        let filter = UrlFilter::default();
        let scope = ProbeScope {
            origin: &origin,
            start_url: "https://example.com/",
            include_query: false,
            filter: &filter,
            limit: 3,
        };
        let mut page = LiveSite::default();
        let mut state = CrawlState::new();
        for i in 0..5 {
            state.enqueue(
                format!("https://example.com/queued-{i}"),
                PRIORITY_REGULAR,
                1,
            );
        }

        let hits = probe_common_paths(&mut page, &mut state, &scope).await;

        // One hit brings the frontier to 2 * limit
        assert_eq!(hits, 1);
        assert_eq!(page.visits, vec!["https://example.com/about"]);
        assert_eq!(state.frontier.len(), 6);
    }

    #[tokio::test]
    async fn test_probe_skips_known_paths_without_navigating() {
        let origin = Url::parse("https://example.com").unwrap();
        let filter = UrlFilter::default();
        let scope = ProbeScope {
            origin: &origin,
            start_url: "https://example.com/",
            include_query: false,
            filter: &filter,
            limit: 1,
        };
        let mut page = LiveSite::default();
        let mut state = CrawlState::new();
        state.depth_index.index("https://example.com/about", 1);
        state.disallow.insert("/about-us".to_string());

        let hits = probe_common_paths(&mut page, &mut state, &scope).await;

        assert_eq!(hits, 1);
        assert_eq!(page.visits, vec!["https://example.com/company"]);
    }

    #[test]
    fn test_catalog_is_unique_and_rooted() {
        let unique: std::collections::HashSet<_> = COMMON_PATHS.iter().collect();
        assert_eq!(unique.len(), COMMON_PATHS.len());
        assert!(COMMON_PATHS.len() >= 75);
        assert!(COMMON_PATHS.iter().all(|p| p.starts_with('/')));
    }

    #[test]
    fn test_soft_404_by_title_or_heading() {
        assert!(looks_like_soft_404(
            "<html><head><title>Page Not Found | Acme</title></head><body></body></html>"
        ));
        assert!(looks_like_soft_404(
            "<html><body><h1>Oops! That page doesn't exist.</h1></body></html>"
        ));
        assert!(looks_like_soft_404(
            "<html><head><title>Error 404</title></head><body>x</body></html>"
        ));
    }

    #[test]
    fn test_soft_404_by_short_body() {
        assert!(looks_like_soft_404(
            "<html><body><p>Sorry, we couldn't find what you were looking for.</p></body></html>"
        ));
    }

    #[test]
    fn test_long_bodies_are_not_scanned() {
        let filler = "Our team has been building accessible products for years. ".repeat(30);
        let html = format!(
            "<html><head><title>About us</title></head><body><h1>About</h1><p>{filler}</p><p>Broken links are reported as not found.</p></body></html>"
        );
        assert!(!looks_like_soft_404(&html));
    }

    #[test]
    fn test_real_pages_pass() {
        assert!(!looks_like_soft_404(
            "<html><head><title>Contact</title></head><body><h1>Contact us</h1><p>Call 4045551234.</p></body></html>"
        ));
    }

    #[test]
    fn test_scripts_are_not_visible_text() {
        let html = r#"<html><head><title>Pricing</title></head><body><h1>Pricing</h1>
            <script>if (missing) { show("not found") }</script><p>Plans start at $5.</p></body></html>"#;
        assert!(!looks_like_soft_404(html));
    }

    #[test]
    fn test_scope_caps() {
        let origin = Url::parse("https://example.com").unwrap();
        let filter = UrlFilter::default();
        let scope = ProbeScope {
            origin: &origin,
            start_url: "https://example.com/",
            include_query: false,
            filter: &filter,
            limit: 100,
        };
        assert_eq!(scope.max_hits(), MAX_PROBE_HITS);
        assert_eq!(scope.max_frontier(), 200);
    }
}
