//! Sitemap discovery and flattening.
//!
//! The loader tries robots-declared sitemaps first, then a catalog of
//! conventional locations, and flattens every `<urlset>` it reaches (through
//! any number of `<sitemapindex>` levels up to [`MAX_SITEMAP_DEPTH`]) into one
//! ordered set of same-origin page URLs.
//!
//! ## Quick Start
//!
//! ```rust
//! use scout_core::sitemap::{parse_sitemap_document, SitemapDocument};
//!
//! let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url><loc>https://example.com/page1</loc></url>
//! </urlset>"#;
//!
//! let doc = parse_sitemap_document(xml)?;
//! assert_eq!(
//!     doc,
//!     Some(SitemapDocument::UrlSet(vec!["https://example.com/page1".to_string()]))
//! );
//! # Ok::<(), scout_core::Error>(())
//! ```
//!
//! Fetching is sequential on purpose: one request at a time keeps the load on
//! the audited site predictable.

use crate::policy::{is_crawlable, is_same_origin};
use crate::{Error, Result};
use indexmap::IndexSet;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Timeout for each sitemap request.
pub const SITEMAP_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum nesting of sitemap indexes.
pub const MAX_SITEMAP_DEPTH: u8 = 5;

/// Conventional sitemap locations tried after the robots-declared ones.
pub const SITEMAP_CATALOG: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/wp-sitemap.xml",
    "/sitemap-index.xml",
    "/sitemap1.xml",
    "/sitemaps.xml",
    "/sitemap/sitemap.xml",
    "/post-sitemap.xml",
    "/page-sitemap.xml",
];

/// Entries matching this are sitemap files, not pages.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static SITEMAP_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)sitemap.*\.xml$").unwrap());

/// Parsed body of a sitemap response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A `<sitemapindex>`: locations of child sitemaps.
    Index(Vec<String>),
    /// A `<urlset>`: page locations.
    UrlSet(Vec<String>),
}

/// `true` when `url` looks like a sitemap file rather than a page.
#[must_use]
pub fn is_sitemap_file(url: &str) -> bool {
    SITEMAP_FILE.is_match(url)
}

/// Check whether a response looks like XML.
#[must_use]
pub fn looks_like_xml(content_type: Option<&str>, body: &str) -> bool {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("xml")) {
        return true;
    }
    body.trim_start().starts_with("<?xml")
        || body.contains("<urlset")
        || body.contains("<sitemapindex")
}

/// Parse a sitemap body.
///
/// Returns `Ok(None)` when the document is neither a sitemap index nor a
/// urlset. `<loc>` values may be plain text or CDATA.
pub fn parse_sitemap_document(xml: &str) -> Result<Option<SitemapDocument>> {
    if xml.contains("<sitemapindex") {
        Ok(Some(SitemapDocument::Index(collect_locs(xml, "sitemap")?)))
    } else if xml.contains("<urlset") {
        Ok(Some(SitemapDocument::UrlSet(collect_locs(xml, "url")?)))
    } else {
        Ok(None)
    }
}

/// Collect the `<loc>` text of every `<entry>` element.
fn collect_locs(xml: &str, entry: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut buf = Vec::new();
    let mut in_entry = false;
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                name if name == entry.as_bytes() => in_entry = true,
                b"loc" if in_entry => {
                    in_loc = true;
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"loc" if in_loc => {
                    let loc = current.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                    in_loc = false;
                }
                name if name == entry.as_bytes() => in_entry = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_loc => {
                let text = e.unescape().map_err(|e| Error::Parse(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::CData(e)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Parse(format!("XML parse error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(locs)
}

/// Accumulator for one [`SitemapLoader::load`] call.
struct Walk {
    origin: Url,
    cap: usize,
    visited: HashSet<String>,
    urls: IndexSet<String>,
}

impl Walk {
    fn is_full(&self) -> bool {
        self.urls.len() >= self.cap
    }
}

type WalkFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Resolves sitemap locations into a flat set of page URLs.
#[derive(Debug, Clone)]
pub struct SitemapLoader {
    client: Client,
}

impl SitemapLoader {
    /// Create a loader using `client` for every request.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Ordered, de-duplicated list of locations to try for `origin`.
    #[must_use]
    pub fn candidate_locations(origin: &Url, robots_sitemaps: &IndexSet<String>) -> Vec<String> {
        let mut locations: IndexSet<String> = robots_sitemaps.iter().cloned().collect();
        for path in SITEMAP_CATALOG {
            if let Ok(url) = origin.join(path) {
                locations.insert(url.to_string());
            }
        }
        locations.into_iter().collect()
    }

    /// Collect same-origin page URLs from every reachable sitemap.
    ///
    /// Stops trying further locations once `2 * limit` URLs are collected.
    /// A failing location is logged and skipped.
    #[instrument(skip(self, robots_sitemaps), fields(origin = %origin))]
    pub async fn load(
        &self,
        origin: &Url,
        limit: usize,
        robots_sitemaps: &IndexSet<String>,
    ) -> IndexSet<String> {
        let mut walk = Walk {
            origin: origin.clone(),
            cap: limit.saturating_mul(2),
            visited: HashSet::new(),
            urls: IndexSet::new(),
        };

        for location in Self::candidate_locations(origin, robots_sitemaps) {
            if walk.is_full() {
                break;
            }
            if let Err(e) = self.parse_sitemap(&mut walk, location.clone(), 0).await {
                log_sitemap_failure(&location, &e);
            }
        }

        debug!(count = walk.urls.len(), "Sitemap phase finished");
        walk.urls
    }

    /// Fetch one sitemap and fold it into `walk`, recursing into indexes.
    fn parse_sitemap<'a>(&'a self, walk: &'a mut Walk, url: String, depth: u8) -> WalkFuture<'a> {
        Box::pin(async move {
            if depth > MAX_SITEMAP_DEPTH {
                debug!(url = %url, "Sitemap nesting too deep, skipping");
                return Ok(());
            }
            if !walk.visited.insert(url.clone()) {
                return Ok(());
            }

            debug!(url = %url, depth, "Fetching sitemap");
            let response = self
                .client
                .get(&url)
                .header(ACCEPT, "application/xml, text/xml, */*")
                .timeout(SITEMAP_TIMEOUT)
                .send()
                .await?;

            let final_url = response.url().to_string();
            if final_url != url && !walk.visited.insert(final_url) {
                debug!(url = %url, "Sitemap redirected to an already visited location");
                return Ok(());
            }

            let status = response.status();
            if !status.is_success() {
                return Err(Error::SourceUnavailable {
                    url,
                    status: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await?;

            if !looks_like_xml(content_type.as_deref(), &body) {
                return Err(Error::Parse(format!("{url} is not an XML document")));
            }

            match parse_sitemap_document(&body)? {
                Some(SitemapDocument::Index(children)) => {
                    debug!(url = %url, children = children.len(), "Sitemap index");
                    for child in children {
                        if walk.is_full() {
                            break;
                        }
                        if let Err(e) = self.parse_sitemap(walk, child.clone(), depth + 1).await {
                            log_sitemap_failure(&child, &e);
                        }
                    }
                }
                Some(SitemapDocument::UrlSet(locs)) => {
                    let before = walk.urls.len();
                    for loc in locs {
                        if let Some(page) = accept_page_url(&walk.origin, &loc) {
                            walk.urls.insert(page);
                        }
                    }
                    debug!(url = %url, added = walk.urls.len() - before, "Sitemap urlset");
                }
                None => {
                    debug!(url = %url, "XML document is not a sitemap");
                }
            }
            Ok(())
        })
    }
}

/// Keep `loc` when it is a same-origin, crawlable page and not a sitemap.
fn accept_page_url(origin: &Url, loc: &str) -> Option<String> {
    let url = Url::parse(loc).ok()?;
    if !is_same_origin(&url, origin) || !is_crawlable(&url) || is_sitemap_file(url.path()) {
        return None;
    }
    Some(url.to_string())
}

fn log_sitemap_failure(location: &str, err: &Error) {
    match err {
        Error::SourceUnavailable { status: 404, .. } => {
            debug!(url = %location, "No sitemap at location");
        }
        _ => warn!(url = %location, error = %err, "Failed to load sitemap"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn urlset(locs: &[String]) -> String {
        let entries: String = locs
            .iter()
            .map(|l| format!("<url><loc>{l}</loc></url>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#
        )
    }

    fn index(locs: &[String]) -> String {
        let entries: String = locs
            .iter()
            .map(|l| format!("<sitemap><loc>{l}</loc></sitemap>"))
            .collect();
        format!(r#"<?xml version="1.0"?><sitemapindex>{entries}</sitemapindex>"#)
    }

    fn xml(body: String) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body, "application/xml")
    }

    #[test]
    fn test_parse_urlset_with_cdata_and_entities() {
        let xml = r#"<urlset>
            <url><loc><![CDATA[https://example.com/a]]></loc></url>
            <url><loc>https://example.com/b?x=1&amp;y=2</loc><lastmod>2024-01-01</lastmod></url>
        </urlset>"#;
        let doc = parse_sitemap_document(xml).unwrap().unwrap();
        assert_eq!(
            doc,
            SitemapDocument::UrlSet(vec![
                "https://example.com/a".to_string(),
                "https://example.com/b?x=1&y=2".to_string(),
            ])
        );
    }

    #[test]
    fn test_parse_index() {
        let xml = index(&["https://example.com/s1.xml".to_string()]);
        assert_eq!(
            parse_sitemap_document(&xml).unwrap(),
            Some(SitemapDocument::Index(vec![
                "https://example.com/s1.xml".to_string()
            ]))
        );
    }

    #[test]
    fn test_non_sitemap_documents() {
        assert_eq!(parse_sitemap_document("<rss></rss>").unwrap(), None);
        assert!(parse_sitemap_document("<urlset><url><loc>x</url></urlset>").is_err());
    }

    #[test]
    fn test_xml_detection() {
        assert!(looks_like_xml(Some("text/xml; charset=utf-8"), ""));
        assert!(looks_like_xml(None, "  <?xml version=\"1.0\"?><foo/>"));
        assert!(looks_like_xml(Some("text/plain"), "<urlset></urlset>"));
        assert!(!looks_like_xml(Some("text/html"), "<html></html>"));
    }

    #[test]
    fn test_sitemap_file_pattern() {
        assert!(is_sitemap_file("/post-sitemap.xml"));
        assert!(is_sitemap_file("/Sitemap_2.XML"));
        assert!(!is_sitemap_file("/sitemap"));
        assert!(!is_sitemap_file("/about"));
    }

    #[test]
    fn test_candidate_locations_put_robots_first() {
        let origin = Url::parse("https://example.com").unwrap();
        let robots: IndexSet<String> = [
            "https://example.com/custom.xml",
            "https://example.com/sitemap.xml",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        let locations = SitemapLoader::candidate_locations(&origin, &robots);
        assert_eq!(locations[0], "https://example.com/custom.xml");
        assert_eq!(locations[1], "https://example.com/sitemap.xml");
        assert_eq!(
            locations
                .iter()
                .filter(|l| l.ends_with("/sitemap.xml"))
                .count(),
            1
        );
        assert_eq!(locations.len(), SITEMAP_CATALOG.len() + 1);
    }

    #[tokio::test]
    async fn test_load_flattens_index_and_filters_entries() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(xml(index(&[
                format!("{base}/pages.xml"),
                format!("{base}/missing.xml"),
                format!("{base}/posts.xml"),
            ])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pages.xml"))
            .respond_with(xml(urlset(&[
                format!("{base}/about"),
                format!("{base}/contact"),
                "https://elsewhere.example/page".to_string(),
                format!("{base}/nested-sitemap.xml"),
                format!("{base}/brochure.pdf"),
            ])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts.xml"))
            .respond_with(xml(urlset(&[format!("{base}/blog/hello")])))
            .mount(&mock_server)
            .await;

        let origin = Url::parse(&base).unwrap();
        let loader = SitemapLoader::new(Client::new());
        let urls = loader.load(&origin, 50, &IndexSet::new()).await;

        let urls: Vec<_> = urls.into_iter().collect();
        assert_eq!(
            urls,
            vec![
                format!("{base}/about"),
                format!("{base}/contact"),
                format!("{base}/blog/hello"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_location_does_not_stop_the_phase() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();

        Mock::given(method("GET"))
            .and(path("/broken.xml"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(xml(urlset(&[format!("{base}/found")])))
            .mount(&mock_server)
            .await;

        let origin = Url::parse(&base).unwrap();
        let robots: IndexSet<String> = [format!("{base}/broken.xml")].into_iter().collect();
        let urls = SitemapLoader::new(Client::new())
            .load(&origin, 10, &robots)
            .await;
        assert!(urls.contains(&format!("{base}/found")));
    }

    #[tokio::test]
    async fn test_self_referencing_index_terminates() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(xml(index(&[
                format!("{base}/sitemap.xml"),
                format!("{base}/loop.xml"),
            ])))
            .mount(&mock_server)
            .await;
        // Redirects back to the index that was already visited
        Mock::given(method("GET"))
            .and(path("/loop.xml"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{base}/sitemap.xml").as_str()),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let origin = Url::parse(&base).unwrap();
        let urls = SitemapLoader::new(Client::new())
            .load(&origin, 10, &IndexSet::new())
            .await;
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn test_index_nesting_stops_at_max_depth() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();
        let level = |n: u8| {
            if n == 0 {
                "/sitemap.xml".to_string()
            } else {
                format!("/s{n}.xml")
            }
        };

        // /sitemap.xml -> /s1.xml -> ... -> /s6.xml, one index per level
        for n in 0..=MAX_SITEMAP_DEPTH {
            Mock::given(method("GET"))
                .and(path(level(n)))
                .respond_with(xml(index(&[format!("{base}{}", level(n + 1))])))
                .expect(1)
                .mount(&mock_server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(level(MAX_SITEMAP_DEPTH + 1)))
            .respond_with(xml(urlset(&[format!("{base}/too-deep")])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let origin = Url::parse(&base).unwrap();
        let urls = SitemapLoader::new(Client::new())
            .load(&origin, 10, &IndexSet::new())
            .await;
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn test_stops_after_twice_the_limit() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();
        let pages: Vec<String> = (0..6).map(|i| format!("{base}/page-{i}")).collect();

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(xml(urlset(&pages)))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(xml(urlset(&[format!("{base}/never")])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let origin = Url::parse(&base).unwrap();
        let urls = SitemapLoader::new(Client::new())
            .load(&origin, 3, &IndexSet::new())
            .await;
        assert_eq!(urls.len(), 6);
    }
}
