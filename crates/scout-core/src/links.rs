//! Link harvesting from rendered pages.
//!
//! Links are split into two buckets. **Navigation** links sit inside site
//! chrome (`<nav>`, `<header>`, `<footer>`, landmark roles, menu-like classes)
//! or are breadcrumbs. Everything else is **regular**, including the
//! non-anchor sources:
//!
//! - `<link href>` other than stylesheets, icons and resource hints
//! - URL values in `application/ld+json` blocks
//! - `data-href`, `data-link` and `data-url` attributes
//! - `onclick` handlers assigning `location.href`
//! - `<area href>`
//!
//! The serialized DOM is parsed with `scraper`. Open shadow roots are not
//! part of the serialized DOM, so they are collected with a small script and
//! parsed the same way.

use crate::Result;
use crate::browser::Page;
use indexmap::IndexSet;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// Returns `[{ html, inNavigation }]` for every open shadow root, nested ones
/// included. `inNavigation` reflects the host element's ancestry.
pub const SHADOW_ROOTS_SCRIPT: &str = r"() => {
  const NAV = /nav|menu|header|footer/i;
  const LANDMARKS = ['navigation', 'banner', 'contentinfo'];
  const inNavigation = (el) => {
    let node = el;
    while (node && node !== document.body && node !== document.documentElement) {
      const tag = (node.tagName || '').toLowerCase();
      if (tag === 'nav' || tag === 'header' || tag === 'footer') return true;
      const role = node.getAttribute ? node.getAttribute('role') : null;
      if (role && LANDMARKS.includes(role.toLowerCase())) return true;
      const cls = typeof node.className === 'string' ? node.className : '';
      if (NAV.test(node.id || '') || NAV.test(cls)) return true;
      const root = node.getRootNode ? node.getRootNode() : null;
      node = node.parentElement || (root && root.host) || null;
    }
    return false;
  };
  const roots = [];
  const visit = (scope) => {
    scope.querySelectorAll('*').forEach((el) => {
      if (el.shadowRoot) {
        roots.push({ html: el.shadowRoot.innerHTML, inNavigation: inNavigation(el) });
        visit(el.shadowRoot);
      }
    });
  };
  visit(document);
  return roots;
}";

const NAV_TAGS: &[&str] = &["nav", "header", "footer"];
const NAV_ROLES: &[&str] = &["navigation", "banner", "contentinfo"];
const NAV_MARKERS: &[&str] = &["nav", "menu", "header", "footer"];
const EXCLUDED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:"];
const EXCLUDED_LINK_RELS: &[&str] = &[
    "stylesheet",
    "icon",
    "shortcut",
    "apple-touch-icon",
    "mask-icon",
    "preload",
    "modulepreload",
    "prefetch",
    "dns-prefetch",
    "preconnect",
    "manifest",
];
const LD_JSON_URL_KEYS: &[&str] = &[
    "url",
    "mainEntityOfPage",
    "sameAs",
    "relatedLink",
    "hasPart",
];
const DATA_URL_ATTRS: &[&str] = &["data-href", "data-link", "data-url"];

macro_rules! selector {
    ($name:ident, $css:literal) => {
        /// SAFETY: Selector is a compile-time constant that is known to be valid.
        #[allow(clippy::unwrap_used)]
        static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(ANCHORS, "a[href]");
selector!(BASE, "base[href]");
selector!(LINK_TAGS, "link[href]");
selector!(LD_JSON, r#"script[type="application/ld+json"]"#);
selector!(DATA_URLS, "[data-href], [data-link], [data-url]");
selector!(ONCLICK, "[onclick]");
selector!(AREAS, "area[href]");

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static ONCLICK_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:window\.|document\.)?location(?:\.href)?\s*=\s*['"]([^'"]+)['"]"#).unwrap()
});

/// Links harvested from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLinks {
    /// Absolute URLs found in navigation areas and breadcrumbs.
    pub navigation: Vec<String>,
    /// All other absolute URLs.
    pub regular: Vec<String>,
}

impl ExtractedLinks {
    /// Total number of links in both buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.navigation.len() + self.regular.len()
    }

    /// `true` when no link was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.navigation.is_empty() && self.regular.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShadowFragment {
    html: String,
    #[serde(default)]
    in_navigation: bool,
}

/// Harvest links from the document currently loaded in `page`.
///
/// `page_url` is the URL the document was served from. With
/// `pierce_shadow_dom`, links inside open shadow roots are included. Script
/// failures while collecting shadow roots are treated as "no shadow roots".
pub async fn extract_links(
    page: &mut dyn Page,
    page_url: &Url,
    pierce_shadow_dom: bool,
) -> Result<ExtractedLinks> {
    let html = page.content().await?;
    let mut harvest = LinkHarvest::new(page_url.clone());
    harvest.add_document(&html);

    if pierce_shadow_dom {
        for fragment in shadow_fragments(page).await {
            harvest.add_fragment(&fragment.html, fragment.in_navigation);
        }
    }

    Ok(harvest.finish())
}

/// Harvest links from a serialized HTML document.
#[must_use]
pub fn extract_from_html(html: &str, page_url: &Url) -> ExtractedLinks {
    let mut harvest = LinkHarvest::new(page_url.clone());
    harvest.add_document(html);
    harvest.finish()
}

async fn shadow_fragments(page: &mut dyn Page) -> Vec<ShadowFragment> {
    let value = match page.evaluate(SHADOW_ROOTS_SCRIPT, Vec::new()).await {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "Shadow root collection unavailable");
            return Vec::new();
        }
    };
    match serde_json::from_value::<Vec<ShadowFragment>>(value) {
        Ok(fragments) => fragments,
        Err(e) => {
            debug!(error = %e, "Unexpected shadow root script result");
            Vec::new()
        }
    }
}

/// Accumulates links across a document and its shadow fragments.
///
/// Parsed trees never outlive a single `add_*` call, so the harvest can be
/// held across awaits.
struct LinkHarvest {
    base: Url,
    navigation: IndexSet<String>,
    regular: IndexSet<String>,
}

impl LinkHarvest {
    fn new(base: Url) -> Self {
        Self {
            base,
            navigation: IndexSet::new(),
            regular: IndexSet::new(),
        }
    }

    fn add_document(&mut self, html: &str) {
        let document = Html::parse_document(html);
        if let Some(href) = document
            .select(&BASE)
            .next()
            .and_then(|base| base.value().attr("href"))
        {
            if let Ok(base) = self.base.join(href.trim()) {
                self.base = base;
            }
        }
        self.collect(&document, false);
    }

    fn add_fragment(&mut self, html: &str, in_navigation: bool) {
        let fragment = Html::parse_fragment(html);
        self.collect(&fragment, in_navigation);
    }

    fn collect(&mut self, tree: &Html, force_navigation: bool) {
        for anchor in tree.select(&ANCHORS) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let navigation = force_navigation || is_navigation(anchor) || is_breadcrumb(anchor);
            self.push(href, navigation);
        }

        for link in tree.select(&LINK_TAGS) {
            let rel = link
                .value()
                .attr("rel")
                .unwrap_or_default()
                .to_ascii_lowercase();
            if rel
                .split_whitespace()
                .any(|r| EXCLUDED_LINK_RELS.contains(&r))
            {
                continue;
            }
            if let Some(href) = link.value().attr("href") {
                self.push(href, force_navigation);
            }
        }

        for script in tree.select(&LD_JSON) {
            let text: String = script.text().collect();
            let Ok(value) = serde_json::from_str::<Value>(text.trim()) else {
                continue;
            };
            let mut found = Vec::new();
            walk_ld_json(&value, &mut found);
            for url in found {
                self.push(&url, force_navigation);
            }
        }

        for element in tree.select(&DATA_URLS) {
            for attr in DATA_URL_ATTRS {
                if let Some(value) = element.value().attr(attr) {
                    self.push(value, force_navigation);
                }
            }
        }

        for element in tree.select(&ONCLICK) {
            let handler = element.value().attr("onclick").unwrap_or_default();
            for capture in ONCLICK_LOCATION.captures_iter(handler) {
                if let Some(target) = capture.get(1) {
                    self.push(target.as_str(), force_navigation);
                }
            }
        }

        for area in tree.select(&AREAS) {
            if let Some(href) = area.value().attr("href") {
                self.push(href, force_navigation);
            }
        }
    }

    fn push(&mut self, raw: &str, navigation: bool) {
        let Some(url) = resolve_target(&self.base, raw) else {
            return;
        };
        if navigation {
            self.navigation.insert(url);
        } else {
            self.regular.insert(url);
        }
    }

    fn finish(self) -> ExtractedLinks {
        let navigation = self.navigation;
        let regular = self
            .regular
            .into_iter()
            .filter(|url| !navigation.contains(url))
            .collect();
        ExtractedLinks {
            navigation: navigation.into_iter().collect(),
            regular,
        }
    }
}

/// Resolve a link target to an absolute http(s) URL.
fn resolve_target(base: &Url, raw: &str) -> Option<String> {
    let target = raw.trim();
    if target.is_empty() || target.starts_with('#') {
        return None;
    }
    let lowered = target.to_ascii_lowercase();
    if EXCLUDED_SCHEMES.iter().any(|s| lowered.starts_with(s)) {
        return None;
    }
    let url = base.join(target).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Collect URL-shaped strings under well-known keys, at any nesting level.
fn walk_ld_json(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if LD_JSON_URL_KEYS.contains(&key.as_str()) {
                    collect_url_strings(child, out);
                }
                walk_ld_json(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_ld_json(item, out);
            }
        }
        _ => {}
    }
}

/// Every URL-shaped string in `value`, including `@id` of nested nodes.
fn collect_url_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if looks_like_url(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                collect_url_strings(item, out);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                collect_url_strings(child, out);
            }
        }
        _ => {}
    }
}

fn looks_like_url(s: &str) -> bool {
    let s = s.trim();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with('/')
}

fn marker_attr_matches(element: &ElementRef<'_>, attr: &str, markers: &[&str]) -> bool {
    element.value().attr(attr).is_some_and(|v| {
        let v = v.to_ascii_lowercase();
        markers.iter().any(|m| v.contains(m))
    })
}

/// `true` when an ancestor below `<body>` is site chrome.
fn is_navigation(anchor: ElementRef<'_>) -> bool {
    for ancestor in anchor.ancestors().filter_map(ElementRef::wrap) {
        let name = ancestor.value().name();
        if name == "body" || name == "html" {
            break;
        }
        if NAV_TAGS.contains(&name) {
            return true;
        }
        if ancestor
            .value()
            .attr("role")
            .is_some_and(|role| NAV_ROLES.contains(&role.trim().to_ascii_lowercase().as_str()))
        {
            return true;
        }
        if marker_attr_matches(&ancestor, "class", NAV_MARKERS)
            || marker_attr_matches(&ancestor, "id", NAV_MARKERS)
        {
            return true;
        }
    }
    false
}

/// `true` when the anchor or any ancestor is marked as a breadcrumb.
fn is_breadcrumb(anchor: ElementRef<'_>) -> bool {
    std::iter::once(anchor)
        .chain(anchor.ancestors().filter_map(ElementRef::wrap))
        .any(|el| {
            marker_attr_matches(&el, "class", &["breadcrumb"])
                || marker_attr_matches(&el, "aria-label", &["breadcrumb"])
        })
}
