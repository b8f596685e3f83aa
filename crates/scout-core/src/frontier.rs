//! Crawl state: the frontier, the depth index and the sets around them.

use indexmap::{IndexMap, IndexSet};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Priority of the start URL.
pub const PRIORITY_START: u8 = 0;
/// Priority of sitemap entries.
pub const PRIORITY_SITEMAP: u8 = 1;
/// Priority of links found in navigation areas.
pub const PRIORITY_NAVIGATION: u8 = 2;
/// Priority of all other links.
pub const PRIORITY_REGULAR: u8 = 3;
/// Priority of pages found by the common-path probe.
pub const PRIORITY_PROBE: u8 = 4;

/// A page proposed for crawling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Canonical URL.
    pub url: String,
    /// Lower values are dequeued first.
    pub priority: u8,
    /// Link hops from the start URL.
    pub depth: u32,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    key: Reverse<(u8, u64)>,
    url: String,
    depth: u32,
}

/// Min-priority queue of [`Candidate`]s.
///
/// Ties are broken by insertion order, so equal-priority candidates come out
/// first-in first-out.
#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<Entry>,
    seq: u64,
}

impl Frontier {
    /// Create an empty frontier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate.
    pub fn push(&mut self, candidate: Candidate) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Entry {
            key: Reverse((candidate.priority, seq)),
            url: candidate.url,
            depth: candidate.depth,
        });
    }

    /// Remove and return the candidate with the lowest priority value.
    pub fn pop(&mut self) -> Option<Candidate> {
        self.heap.pop().map(|entry| Candidate {
            url: entry.url,
            priority: entry.key.0.0,
            depth: entry.depth,
        })
    }

    /// Number of queued candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// `true` when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Depth at which each canonical URL was first enqueued. Write-once per key.
#[derive(Debug, Default, Clone)]
pub struct DepthIndex {
    depths: IndexMap<String, u32>,
}

impl DepthIndex {
    /// Record `depth` for `url` unless it is already indexed.
    ///
    /// Returns `true` when the entry was new.
    pub fn index(&mut self, url: &str, depth: u32) -> bool {
        if self.depths.contains_key(url) {
            return false;
        }
        self.depths.insert(url.to_string(), depth);
        true
    }

    /// `true` when `url` already has a depth.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.depths.contains_key(url)
    }

    /// Depth recorded for `url`.
    #[must_use]
    pub fn depth(&self, url: &str) -> Option<u32> {
        self.depths.get(url).copied()
    }

    /// Number of indexed URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.depths.len()
    }

    /// `true` when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}

/// All mutable state of one discovery run.
///
/// Each phase of the orchestrator borrows this struct instead of keeping its
/// own copies, so independent runs never share anything.
#[derive(Debug, Default)]
pub struct CrawlState {
    /// Pages navigated to and harvested, in visit order.
    pub visited: IndexSet<String>,
    /// First-seen depth of every enqueued URL.
    pub depth_index: DepthIndex,
    /// Robots.txt `Disallow` rules in effect.
    pub disallow: IndexSet<String>,
    /// URLs harvested from sitemaps.
    pub sitemap_urls: IndexSet<String>,
    /// Pages waiting to be visited.
    pub frontier: Frontier,
}

impl CrawlState {
    /// Create empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `url` at `depth` and queue it, unless it was indexed before.
    ///
    /// Returns `true` when the candidate was queued.
    pub fn enqueue(&mut self, url: String, priority: u8, depth: u32) -> bool {
        if !self.depth_index.index(&url, depth) {
            return false;
        }
        self.frontier.push(Candidate {
            url,
            priority,
            depth,
        });
        true
    }
}
