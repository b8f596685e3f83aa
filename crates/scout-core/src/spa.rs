//! Client-side route detection.
//!
//! Single-page apps change the URL through the History API without a page
//! load, so those routes never show up as navigations. The detector wraps
//! `history.pushState`/`history.replaceState` and listens for `popstate` in
//! every new document, forwarding each resulting URL to the crawler over a
//! channel.
//!
//! Routes are drained once per visited page. A route is attributed to
//! whichever page is current when the drain happens, which is not
//! necessarily the page whose script produced it.

use crate::Result;
use crate::browser::Page;
use crate::policy::is_same_origin;
use indexmap::IndexSet;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::debug;
use url::Url;

/// Name of the page-side function that forwards route changes.
pub const ROUTE_BINDING: &str = "__scoutRouteChanged";

/// Installed before any page script runs.
fn history_hook_script() -> String {
    format!(
        r"(() => {{
  if (window.__scoutHistoryHooked) return;
  window.__scoutHistoryHooked = true;
  const forward = (target) => {{
    try {{
      const href = new URL(target, location.href).href;
      if (typeof window.{ROUTE_BINDING} === 'function') window.{ROUTE_BINDING}(href);
    }} catch (_) {{}}
  }};
  for (const method of ['pushState', 'replaceState']) {{
    const original = history[method];
    history[method] = function (state, title, url) {{
      const result = original.apply(this, arguments);
      if (url !== undefined && url !== null) forward(String(url));
      return result;
    }};
  }}
  window.addEventListener('popstate', () => forward(location.href));
}})();"
    )
}

/// Receiving end of the route bridge for one page.
#[derive(Debug)]
pub struct SpaRouteDetector {
    origin: Url,
    routes: UnboundedReceiver<String>,
}

impl SpaRouteDetector {
    /// Expose the bridge on `page` and inject the history hooks.
    pub async fn install(page: &mut dyn Page, origin: &Url) -> Result<Self> {
        let (sender, routes) = mpsc::unbounded_channel();
        page.expose_function(ROUTE_BINDING, sender).await?;
        page.evaluate_on_new_document(&history_hook_script())
            .await?;
        Ok(Self {
            origin: origin.clone(),
            routes,
        })
    }

    /// Take every route forwarded since the last drain.
    ///
    /// Cross-origin and unparseable URLs are dropped.
    pub fn drain(&mut self) -> IndexSet<String> {
        let mut drained = IndexSet::new();
        while let Ok(route) = self.routes.try_recv() {
            match Url::parse(&route) {
                Ok(url) if is_same_origin(&url, &self.origin) => {
                    drained.insert(url.to_string());
                }
                _ => debug!(route = %route, "Ignoring cross-origin route"),
            }
        }
        drained
    }
}
