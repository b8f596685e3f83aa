//! URL policy: canonical forms, robots rules and include/exclude globs.
//!
//! Everything here is pure. The orchestrator runs every candidate URL through
//! [`canonicalize`] before any set lookup, so two spellings of the same page
//! never produce two audits.
//!
//! ## Quick Start
//!
//! ```rust
//! use scout_core::policy::{canonicalize, is_disallowed, matches_patterns};
//! use url::Url;
//!
//! let origin = Url::parse("https://example.com").unwrap();
//! let canonical = canonicalize(&origin, false, "/docs/?tab=1#intro").unwrap();
//! assert_eq!(canonical, "https://example.com/docs");
//!
//! let rules = vec!["/admin".to_string()];
//! assert!(is_disallowed(&canonical.replace("docs", "admin/settings"), &rules));
//!
//! let exclude = vec!["/docs/**".to_string()];
//! assert!(!matches_patterns("https://example.com/docs/a", &[], &exclude));
//! ```

use regex::Regex;
use url::Url;

/// File extensions that never point at an auditable HTML page.
const NON_PAGE_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".avif", ".ico", ".bmp", ".tiff", ".css",
    ".js", ".mjs", ".cjs", ".map", ".woff", ".woff2", ".ttf", ".eot", ".otf", ".pdf", ".doc",
    ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".zip", ".tar", ".gz", ".tgz", ".rar", ".7z",
    ".mp3", ".mp4", ".webm", ".ogg", ".wav", ".mov", ".avi", ".json", ".xml", ".rss", ".atom",
    ".txt", ".csv", ".exe", ".dmg", ".apk", ".msi", ".iso",
];

/// Canonicalize `url` relative to `origin`.
///
/// - Relative URLs are resolved against `origin`
/// - The fragment is always removed
/// - The query string is removed unless `include_query` is set
/// - Trailing slashes are removed unless the path is exactly `/`
///
/// Returns `None` when the input cannot be resolved to a URL. The function is
/// idempotent: canonicalizing a canonical URL returns it unchanged.
#[must_use]
pub fn canonicalize(origin: &Url, include_query: bool, url: &str) -> Option<String> {
    let mut resolved = origin.join(url.trim()).ok()?;
    resolved.set_fragment(None);

    if !include_query || resolved.query() == Some("") {
        resolved.set_query(None);
    }

    let path = resolved.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        resolved.set_path(&trimmed);
    }

    Some(resolved.to_string())
}

/// Check whether `url` is blocked by any robots.txt `Disallow` rule.
///
/// - Rules containing `*` become regexes anchored at the start of `path+query`
/// - Rules containing `?` are literal prefixes of `path+query`
/// - Any other rule is a literal prefix of the path
///
/// Unparseable URLs are never reported as disallowed.
pub fn is_disallowed<'a, I>(url: &str, rules: I) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path();
    let path_and_query = parsed
        .query()
        .map_or_else(|| path.to_string(), |q| format!("{path}?{q}"));

    rules.into_iter().any(|rule| {
        if rule.contains('*') {
            robots_wildcard(rule).is_some_and(|re| re.is_match(&path_and_query))
        } else if rule.contains('?') {
            path_and_query.starts_with(rule.as_str())
        } else {
            path.starts_with(rule.as_str())
        }
    })
}

/// Compile a robots wildcard rule. Only `*` is special.
fn robots_wildcard(rule: &str) -> Option<Regex> {
    let pattern = regex::escape(rule).replace(r"\*", ".*");
    Regex::new(&format!("^{pattern}")).ok()
}

/// Check `url` against include and exclude globs.
///
/// Exclusion wins. With no include patterns every remaining URL is allowed.
/// See [`compile_glob`] for the glob syntax.
#[must_use]
pub fn matches_patterns(
    url: &str,
    include_patterns: &[String],
    exclude_patterns: &[String],
) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    UrlFilter::new(include_patterns, exclude_patterns).allows(&parsed)
}

/// Pre-compiled include/exclude globs.
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    include: Vec<Glob>,
    exclude: Vec<Glob>,
}

#[derive(Debug, Clone)]
struct Glob {
    regex: Regex,
    full_url: bool,
}

impl Glob {
    fn new(pattern: &str) -> Option<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return None;
        }
        Some(Self {
            regex: compile_glob(pattern)?,
            full_url: pattern.contains("://"),
        })
    }

    fn is_match(&self, url: &Url) -> bool {
        if self.full_url {
            let mut without_fragment = url.clone();
            without_fragment.set_fragment(None);
            self.regex.is_match(without_fragment.as_str())
        } else {
            self.regex.is_match(url.path())
        }
    }
}

impl UrlFilter {
    /// Compile the given globs. Empty patterns are ignored.
    #[must_use]
    pub fn new(include_patterns: &[String], exclude_patterns: &[String]) -> Self {
        Self {
            include: include_patterns
                .iter()
                .filter_map(|p| Glob::new(p))
                .collect(),
            exclude: exclude_patterns
                .iter()
                .filter_map(|p| Glob::new(p))
                .collect(),
        }
    }

    /// `true` when `url` passes both pattern lists.
    #[must_use]
    pub fn allows(&self, url: &Url) -> bool {
        if self.exclude.iter().any(|g| g.is_match(url)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|g| g.is_match(url))
    }
}

/// Compile a glob into an anchored regex.
///
/// `**` matches anything, `*` matches within one path segment and `?` matches
/// a single character. Patterns containing `://` are matched against the whole
/// URL, all others against the URL path.
#[must_use]
pub fn compile_glob(pattern: &str) -> Option<Regex> {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).ok()
}

/// `true` when both URLs share scheme, host and port.
#[must_use]
pub fn is_same_origin(url: &Url, origin: &Url) -> bool {
    url.origin() == origin.origin()
}

/// `true` when `url` can plausibly be rendered as an HTML page.
#[must_use]
pub fn is_crawlable(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let path = url.path().to_ascii_lowercase();
    !NON_PAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
