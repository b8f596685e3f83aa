#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(60);

fn home_dir() -> &'static Path {
    static HOME: OnceLock<TempDir> = OnceLock::new();
    HOME.get_or_init(|| tempfile::tempdir().expect("failed to create home dir for tests"))
        .path()
}

/// Create a `scout` command isolated from the user's config.
#[allow(dead_code)]
pub fn scout_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("scout"));
    cmd.timeout(CMD_TIMEOUT);
    let home = home_dir();
    cmd.env("HOME", home);
    cmd.env("XDG_CONFIG_HOME", home.join(".config"));
    cmd.env_remove("SCOUT_CONFIG");
    cmd.env("NO_COLOR", "1");
    cmd
}

#[allow(dead_code)]
pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>Page</title></head><body>{body}</body></html>"),
        "text/html; charset=utf-8",
    )
}

#[allow(dead_code)]
pub async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// A small site: home links to three pages, one of them robots-disallowed.
/// The sitemap declared in robots.txt lists `/about`.
#[allow(dead_code)]
pub async fn small_site() -> MockServer {
    let server = MockServer::start().await;
    mount(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nDisallow: /admin\nSitemap: {}/sitemap.xml\n",
            server.uri()
        )),
    )
    .await;
    mount(
        &server,
        "/",
        html(r#"<nav><a href="/about">About</a></nav><main><a href="/admin/panel">Admin</a><a href="/blog/hello">Hello</a></main>"#),
    )
    .await;
    mount(&server, "/about", html("<h1>About</h1>")).await;
    mount(&server, "/blog/hello", html("<h1>Hello</h1>")).await;
    mount(&server, "/admin/panel", html("<h1>Admin</h1>")).await;
    mount(
        &server,
        "/sitemap.xml",
        ResponseTemplate::new(200).set_body_raw(
            format!(
                "<?xml version=\"1.0\"?><urlset><url><loc>{}/about</loc></url></urlset>",
                server.uri()
            ),
            "application/xml",
        ),
    )
    .await;
    server
}
