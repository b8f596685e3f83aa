//! Static HTTP renderer implementing the browser capability.
//!
//! [`HttpBrowser`] fetches documents with `reqwest` and hands back the raw
//! server HTML. It has no script engine, so:
//!
//! - `evaluate` fails with [`Error::Browser`]
//! - history hooks are accepted but never fire
//! - network-idle waits return immediately
//! - bodies that declare a non-HTML content type are not downloaded, and
//!   `content` fails after such a navigation
//!
//! That is enough for server-rendered sites and for the CLI. Sites that build
//! their navigation client-side need a rendering browser behind the same
//! traits.

use super::{BrowserContext, GotoOptions, Page, PageResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

const MAX_REDIRECTS: usize = 10;

/// `reqwest`-backed [`BrowserContext`].
#[derive(Debug, Clone)]
pub struct HttpBrowser {
    client: Client,
}

impl HttpBrowser {
    /// Build a browser that identifies itself with `user_agent`.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    /// Wrap an existing client. Its redirect policy is used as is.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BrowserContext for HttpBrowser {
    async fn new_page(&self) -> Result<Box<dyn Page>> {
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            html: None,
            route_bridges: Vec::new(),
            init_scripts: Vec::new(),
        }))
    }
}

/// A page of an [`HttpBrowser`].
#[derive(Debug)]
pub struct HttpPage {
    client: Client,
    html: Option<String>,
    // Held so the bridge stays open for the page's lifetime.
    route_bridges: Vec<(String, UnboundedSender<String>)>,
    init_scripts: Vec<String>,
}

#[async_trait]
impl Page for HttpPage {
    async fn goto(&mut self, url: &str, options: GotoOptions) -> Result<PageResponse> {
        self.html = None;
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/html,application/xhtml+xml,*/*;q=0.8")
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| navigation_error(url, options.timeout, &e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let page_response = PageResponse {
            status,
            url: final_url,
            content_type,
        };
        // Non-HTML bodies are left unread
        if page_response.content_type.is_some() && !page_response.is_html() {
            debug!(url, status, content_type = ?page_response.content_type, "Skipped non-HTML body");
            return Ok(page_response);
        }

        let body = response
            .text()
            .await
            .map_err(|e| navigation_error(url, options.timeout, &e))?;
        debug!(url, status, final_url = %page_response.url, bytes = body.len(), "Fetched page");
        self.html = Some(body);

        Ok(page_response)
    }

    async fn wait_for_network_idle(&mut self, _idle: Duration, _timeout: Duration) {}

    async fn content(&mut self) -> Result<String> {
        self.html
            .clone()
            .ok_or_else(|| Error::Browser("no document loaded".to_string()))
    }

    async fn evaluate(&mut self, _script: &str, _args: Vec<Value>) -> Result<Value> {
        Err(Error::Browser(
            "script evaluation is not supported by the HTTP renderer".to_string(),
        ))
    }

    async fn expose_function(&mut self, name: &str, sender: UnboundedSender<String>) -> Result<()> {
        self.route_bridges.push((name.to_string(), sender));
        Ok(())
    }

    async fn evaluate_on_new_document(&mut self, script: &str) -> Result<()> {
        self.init_scripts.push(script.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.html = None;
        self.route_bridges.clear();
        self.init_scripts.clear();
        Ok(())
    }
}

fn navigation_error(url: &str, timeout: Duration, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        return Error::Timeout(format!(
            "navigation to {url} timed out after {}ms",
            timeout.as_millis()
        ));
    }
    Error::Navigation {
        url: url.to_string(),
        reason: err.to_string(),
    }
}
