#![allow(clippy::expect_used, clippy::unwrap_used, dead_code)]

//! Scripted in-memory browser for discovery tests.

use async_trait::async_trait;
use scout_core::{BrowserContext, Error, GotoOptions, Page, PageResponse, Result};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

pub const ORIGIN: &str = "https://site.test";

/// One scripted page.
#[derive(Debug, Clone)]
pub struct FakePage {
    pub status: u16,
    pub html: String,
    pub content_type: String,
    /// Final URL reported after navigation, for redirects.
    pub redirect_to: Option<String>,
    /// `(innerHTML, inNavigation)` of open shadow roots.
    pub shadow_roots: Vec<(String, bool)>,
    /// URLs passed to `history.pushState` once the page has loaded.
    pub push_states: Vec<String>,
    /// Navigation fails outright.
    pub fail: bool,
}

impl FakePage {
    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            html: format!("<html><head><title>Page</title></head><body>{body}</body></html>"),
            content_type: "text/html; charset=utf-8".to_string(),
            redirect_to: None,
            shadow_roots: Vec::new(),
            push_states: Vec::new(),
            fail: false,
        }
    }

    pub fn links(paths: &[&str]) -> Self {
        let anchors: String = paths
            .iter()
            .map(|p| format!(r#"<a href="{p}">{p}</a>"#))
            .collect();
        Self::html(&format!("<main>{anchors}</main>"))
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::html("<h1>Error</h1>")
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::html("")
        }
    }

    pub fn with_shadow_root(mut self, html: &str, in_navigation: bool) -> Self {
        self.shadow_roots.push((html.to_string(), in_navigation));
        self
    }

    pub fn with_push_state(mut self, path: &str) -> Self {
        self.push_states.push(path.to_string());
        self
    }

    pub fn redirecting_to(mut self, url: &str) -> Self {
        self.redirect_to = Some(url.to_string());
        self
    }
}

/// A site keyed by path. Unknown paths answer 404.
#[derive(Debug, Clone, Default)]
pub struct FakeBrowser {
    pages: Arc<HashMap<String, FakePage>>,
    /// Every URL passed to `goto`, in order.
    pub navigations: Arc<Mutex<Vec<String>>>,
    /// Fail `new_page`.
    pub broken: bool,
}

impl FakeBrowser {
    pub fn new(pages: Vec<(&str, FakePage)>) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(path, page)| (path.to_string(), page))
                    .collect(),
            ),
            navigations: Arc::default(),
            broken: false,
        }
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn navigated_to(&self, path: &str) -> bool {
        let url = format!("{ORIGIN}{path}");
        self.navigations().iter().any(|n| n == &url)
    }
}

#[async_trait]
impl BrowserContext for FakeBrowser {
    async fn new_page(&self) -> Result<Box<dyn Page>> {
        if self.broken {
            return Err(Error::Browser("browser crashed".to_string()));
        }
        Ok(Box::new(FakeTab {
            browser: self.clone(),
            current: None,
            bridge: None,
            hooks_installed: false,
        }))
    }
}

struct FakeTab {
    browser: FakeBrowser,
    current: Option<FakePage>,
    bridge: Option<UnboundedSender<String>>,
    hooks_installed: bool,
}

#[async_trait]
impl Page for FakeTab {
    async fn goto(&mut self, url: &str, _options: GotoOptions) -> Result<PageResponse> {
        self.browser
            .navigations
            .lock()
            .unwrap()
            .push(url.to_string());
        let parsed = Url::parse(url).map_err(Error::from)?;
        let page = self
            .browser
            .pages
            .get(parsed.path())
            .cloned()
            .unwrap_or_else(|| FakePage::status(404));

        if page.fail {
            self.current = None;
            return Err(Error::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }

        if self.hooks_installed {
            if let Some(bridge) = &self.bridge {
                for route in &page.push_states {
                    let href = parsed.join(route).unwrap().to_string();
                    let _ = bridge.send(href);
                }
            }
        }

        let response = PageResponse {
            status: page.status,
            url: page.redirect_to.clone().unwrap_or_else(|| url.to_string()),
            content_type: Some(page.content_type.clone()),
        };
        self.current = Some(page);
        Ok(response)
    }

    async fn wait_for_network_idle(&mut self, _idle: Duration, _timeout: Duration) {}

    async fn content(&mut self) -> Result<String> {
        self.current
            .as_ref()
            .map(|p| p.html.clone())
            .ok_or_else(|| Error::Browser("no document".to_string()))
    }

    async fn evaluate(&mut self, _script: &str, _args: Vec<Value>) -> Result<Value> {
        let roots = self
            .current
            .as_ref()
            .map(|p| p.shadow_roots.clone())
            .unwrap_or_default();
        Ok(Value::Array(
            roots
                .into_iter()
                .map(|(html, in_nav)| json!({ "html": html, "inNavigation": in_nav }))
                .collect(),
        ))
    }

    async fn expose_function(
        &mut self,
        _name: &str,
        sender: UnboundedSender<String>,
    ) -> Result<()> {
        self.bridge = Some(sender);
        Ok(())
    }

    async fn evaluate_on_new_document(&mut self, script: &str) -> Result<()> {
        self.hooks_installed = script.contains("pushState");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.current = None;
        Ok(())
    }
}

/// Config for the fake site with network sources switched off.
pub fn offline_config() -> scout_core::CrawlerConfig {
    let mut config = scout_core::CrawlerConfig::new(&format!("{ORIGIN}/")).unwrap();
    config.use_sitemap = false;
    config.respect_robots_txt = false;
    config.discover_common_paths = false;
    config
}

pub fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}
