//! Browser capability consumed by the discovery engine.
//!
//! Discovery never talks to a concrete browser. It asks a [`BrowserContext`]
//! for one [`Page`] and drives it through navigation, DOM serialization,
//! script evaluation and the route-change bridge. A headless Chromium adapter
//! and the bundled [`http::HttpBrowser`] plug in through the same traits.
//!
//! The route bridge is one-way: the page pushes URLs into an
//! [`UnboundedSender`] and the crawler drains the receiving end when it is
//! ready. Nothing on the page side ever waits for the crawler.

pub mod http;

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Navigation lifecycle event that [`Page::goto`] waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    /// The `load` event fired.
    Load,
    /// The `DOMContentLoaded` event fired.
    #[default]
    DomContentLoaded,
    /// No network activity for a short while.
    NetworkIdle,
}

/// Options for a single navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GotoOptions {
    /// Lifecycle event that completes the navigation.
    pub wait_until: WaitUntil,
    /// Upper bound for the whole navigation.
    pub timeout: Duration,
}

impl GotoOptions {
    /// Wait for `DOMContentLoaded` with the given timeout.
    #[must_use]
    pub const fn dom_content_loaded(timeout: Duration) -> Self {
        Self {
            wait_until: WaitUntil::DomContentLoaded,
            timeout,
        }
    }
}

/// Main-frame response of a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    /// HTTP status of the final response.
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
}

impl PageResponse {
    /// `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// `true` when the response declares an HTML body.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
    }
}

/// Source of pages. One context serves one discovery run.
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// Open a fresh page.
    async fn new_page(&self) -> Result<Box<dyn Page>>;
}

/// A single browser tab.
#[async_trait]
pub trait Page: Send {
    /// Navigate to `url`.
    ///
    /// Returns the main-frame response. Error statuses are reported through
    /// [`PageResponse::status`], only transport failures and timeouts are
    /// errors.
    async fn goto(&mut self, url: &str, options: GotoOptions) -> Result<PageResponse>;

    /// Wait until the network has been quiet for `idle`, giving up after
    /// `timeout`. Never fails.
    async fn wait_for_network_idle(&mut self, idle: Duration, timeout: Duration);

    /// Serialized DOM of the current document.
    async fn content(&mut self) -> Result<String>;

    /// Evaluate `script` as a function called with `args` and return its
    /// JSON-serializable result.
    async fn evaluate(&mut self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// Make `window[name](value)` forward `value` to `sender`.
    async fn expose_function(&mut self, name: &str, sender: UnboundedSender<String>) -> Result<()>;

    /// Run `script` in every new document before any page script.
    async fn evaluate_on_new_document(&mut self, script: &str) -> Result<()>;

    /// Close the page. Further calls are undefined.
    async fn close(&mut self) -> Result<()>;
}
