pub mod error;

pub use error::{ChromeError, Result};

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, TimeSinceEpoch};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How often the page is polled while waiting for a selector to appear.
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Options for launching a Chromium process.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit Chromium binary. Auto-detected when `None`.
    pub chrome_bin: Option<PathBuf>,
    pub headless: bool,
    /// Upper bound on any single DevTools request.
    pub request_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            chrome_bin: None,
            headless: true,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// One captured node: its serialized markup plus text as the page renders it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CapturedNode {
    pub html: String,
    /// `innerText` of the text element, `None` when the node has none.
    pub text: Option<String>,
}

/// A browser cookie in the export format written by browser-automation tools
/// (`name`, `value`, `domain`, `path`, `expires`, `httpOnly`, `secure`, `sameSite`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Seconds since the epoch. Session cookies carry `-1`.
    #[serde(default)]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: Option<String>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

impl Cookie {
    fn to_param(&self) -> Result<CookieParam> {
        let mut builder = CookieParam::builder()
            .name(self.name.clone())
            .value(self.value.clone())
            .domain(self.domain.clone())
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(self.http_only);

        if let Some(expires) = self.expires.filter(|e| *e > 0.0) {
            builder = builder.expires(TimeSinceEpoch::new(expires));
        }
        if let Some(same_site) = self.same_site.as_deref().and_then(parse_same_site) {
            builder = builder.same_site(same_site);
        }

        builder.build().map_err(|reason| ChromeError::Cookie {
            name: self.name.clone(),
            reason,
        })
    }
}

fn parse_same_site(raw: &str) -> Option<CookieSameSite> {
    match raw.to_ascii_lowercase().as_str() {
        "strict" => Some(CookieSameSite::Strict),
        "lax" => Some(CookieSameSite::Lax),
        "none" => Some(CookieSameSite::None),
        _ => None,
    }
}

/// Quote a CSS selector as a JavaScript string literal.
fn js_string(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub struct ChromeClient {
    options: LaunchOptions,
}

impl ChromeClient {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }

    /// Launch a fresh Chromium process with its own throwaway profile directory
    /// and open a blank tab.
    pub async fn launch(&self) -> Result<ChromeSession> {
        let profile_dir = tempfile::tempdir()
            .map_err(|e| ChromeError::Launch(format!("failed to create profile dir: {e}")))?;

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .user_data_dir(profile_dir.path())
            .request_timeout(self.options.request_timeout);
        if !self.options.headless {
            builder = builder.with_head();
        }
        if let Some(ref bin) = self.options.chrome_bin {
            builder = builder.chrome_executable(bin);
        }
        let config = builder.build().map_err(ChromeError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ChromeError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "chromium handler event error");
                }
            }
        });

        let mut session = ChromeSession {
            browser: Some(browser),
            page: None,
            handler_task: Some(handler_task),
            profile_dir: Some(profile_dir),
            runtime_handle: tokio::runtime::Handle::current(),
        };

        // On failure the session drops here and tears the process down.
        let page = session.browser()?.new_page("about:blank").await?;
        session.page = Some(page);

        info!(headless = self.options.headless, "chromium session launched");
        Ok(session)
    }
}

/// One Chromium process with a single working tab.
///
/// Prefer [`ChromeSession::close`]; dropping an open session spawns the same
/// teardown on the runtime it was created on.
pub struct ChromeSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
    profile_dir: Option<TempDir>,
    runtime_handle: tokio::runtime::Handle,
}

impl ChromeSession {
    fn browser(&self) -> Result<&Browser> {
        self.browser.as_ref().ok_or(ChromeError::Closed)
    }

    fn page(&self) -> Result<&Page> {
        self.page.as_ref().ok_or(ChromeError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.browser.is_none()
    }

    /// Install cookies into the browser context before navigation.
    pub async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()> {
        let params = cookies
            .iter()
            .map(Cookie::to_param)
            .collect::<Result<Vec<_>>>()?;
        self.page()?.set_cookies(params).await?;
        debug!(count = cookies.len(), "cookies installed");
        Ok(())
    }

    /// Navigate to `url` and wait until `selector` matches at least one node.
    /// Both steps share one `timeout`.
    pub async fn goto_and_wait(&self, url: &str, selector: &str, timeout: Duration) -> Result<()> {
        let page = self.page()?;
        let wait = async {
            page.goto(url).await?;
            loop {
                if self.count(selector).await? > 0 {
                    return Ok::<(), ChromeError>(());
                }
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(ChromeError::Timeout {
                what: format!("{selector} on {url}"),
                seconds: timeout.as_secs(),
            }),
        }
    }

    /// Scroll the document vertically by `dy` pixels.
    pub async fn scroll_by(&self, dy: i64) -> Result<()> {
        self.page()?
            .evaluate(format!("window.scrollBy(0, {dy})"))
            .await?;
        Ok(())
    }

    /// Number of nodes currently matching `selector`.
    pub async fn count(&self, selector: &str) -> Result<usize> {
        let expr = format!("document.querySelectorAll({}).length", js_string(selector)?);
        let result = self.page()?.evaluate(expr).await?;
        Ok(result.into_value::<usize>()?)
    }

    /// The first `limit` nodes matching `selector`, in document order, with
    /// the rendered `innerText` of each node's first `text_selector` match.
    pub async fn capture_nodes(
        &self,
        selector: &str,
        text_selector: &str,
        limit: usize,
    ) -> Result<Vec<CapturedNode>> {
        let expr = capture_script(selector, text_selector, limit)?;
        let result = self.page()?.evaluate(expr).await?;
        Ok(result.into_value::<Vec<CapturedNode>>()?)
    }

    /// The tab's current location, used to resolve relative links.
    pub async fn current_url(&self) -> Result<Option<String>> {
        Ok(self.page()?.url().await?)
    }

    /// Close the tab, shut the browser down and remove the profile directory.
    /// Safe to call more than once.
    pub async fn close(&mut self) {
        let Some(browser) = self.browser.take() else {
            return;
        };
        shutdown(
            browser,
            self.page.take(),
            self.handler_task.take(),
            self.profile_dir.take(),
        )
        .await;
        info!("chromium session closed");
    }
}

async fn shutdown(
    mut browser: Browser,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
    profile_dir: Option<TempDir>,
) {
    if let Some(page) = page {
        if let Err(e) = page.close().await {
            warn!(error = %e, "failed to close tab");
        }
    }
    if let Err(e) = browser.close().await {
        warn!(error = %e, "failed to close browser");
    }
    if let Err(e) = browser.wait().await {
        warn!(error = %e, "failed to reap browser process");
    }
    if let Some(task) = handler_task {
        task.abort();
    }
    drop(profile_dir);
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Some(browser) = self.browser.take() {
            warn!("chromium session dropped without close, tearing down in background");
            let page = self.page.take();
            let handler_task = self.handler_task.take();
            let profile_dir = self.profile_dir.take();
            self.runtime_handle
                .spawn(shutdown(browser, page, handler_task, profile_dir));
        }
    }
}

fn capture_script(selector: &str, text_selector: &str, limit: usize) -> Result<String> {
    Ok(format!(
        "Array.from(document.querySelectorAll({})).slice(0, {limit}).map(el => {{ \
            const t = el.querySelector({}); \
            return {{ html: el.outerHTML, text: t ? t.innerText : null }}; \
        }})",
        js_string(selector)?,
        js_string(text_selector)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_export_format_parses() {
        let json = r#"[{
            "name": "auth_token",
            "value": "abc",
            "domain": ".x.com",
            "path": "/",
            "expires": 1767225600.5,
            "httpOnly": true,
            "secure": true,
            "sameSite": "None"
        }]"#;
        let cookies: Vec<Cookie> = serde_json::from_str(json).unwrap();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].http_only);
        assert_eq!(cookies[0].same_site.as_deref(), Some("None"));
    }

    #[test]
    fn cookie_path_defaults_to_root() {
        let cookie: Cookie =
            serde_json::from_str(r#"{"name":"ct0","value":"x","domain":".x.com"}"#).unwrap();
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.expires, None);
    }

    #[test]
    fn session_cookie_builds_without_expiry() {
        let cookie = Cookie {
            name: "ct0".into(),
            value: "x".into(),
            domain: ".x.com".into(),
            path: "/".into(),
            expires: Some(-1.0),
            http_only: false,
            secure: true,
            same_site: Some("Lax".into()),
        };
        let param = cookie.to_param().unwrap();
        assert!(param.expires.is_none());
        assert_eq!(param.same_site, Some(CookieSameSite::Lax));
    }

    #[test]
    fn unknown_same_site_is_ignored() {
        assert_eq!(parse_same_site("no_restriction"), None);
        assert_eq!(parse_same_site("STRICT"), Some(CookieSameSite::Strict));
    }

    #[test]
    fn selectors_are_quoted_for_scripts() {
        let quoted = js_string("article[data-testid='tweet']").unwrap();
        assert_eq!(quoted, "\"article[data-testid='tweet']\"");
    }

    #[test]
    fn capture_script_reads_rendered_text() {
        let script = capture_script("article", "div[data-testid='tweetText']", 3).unwrap();
        assert!(script.contains(".slice(0, 3)"));
        assert!(script.contains("el.querySelector(\"div[data-testid='tweetText']\")"));
        assert!(script.contains("t.innerText"));
    }

    #[test]
    fn captured_node_without_text_element() {
        let nodes: Vec<CapturedNode> =
            serde_json::from_str(r#"[{"html":"<article></article>","text":null}]"#).unwrap();
        assert_eq!(nodes[0].text, None);
    }
}
