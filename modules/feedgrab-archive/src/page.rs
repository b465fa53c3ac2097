// Rendering boundary: the capabilities the pipeline needs from a live page.
// Chromium implements it in services::chrome; tests supply scripted pages.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// One item node as captured from the live page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedItem {
    /// Serialized outer HTML.
    pub html: String,
    /// Rendered text of the item's text body. Serialized markup cannot tell
    /// which nodes stylesheets hide, so this is what the reader actually saw.
    pub text: Option<String>,
}

impl CapturedItem {
    /// Markup only; text falls back to what the markup shows.
    pub fn markup(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            text: None,
        }
    }
}

/// Matching item nodes, captured in document order, plus the page location
/// used to resolve relative links.
#[derive(Debug, Clone, Default)]
pub struct CapturedItems {
    pub base_url: Option<String>,
    pub items: Vec<CapturedItem>,
}

/// A rendered, controllable page owned by exactly one run.
#[async_trait]
pub trait ProfilePage: Send + Sync {
    /// Navigate to `url` and wait for `marker` to match within `timeout`.
    /// A marker that never appears is `ArchiveError::NavigationTimeout`.
    async fn goto_and_wait(&self, url: &str, marker: &str, timeout: Duration) -> Result<()>;

    async fn scroll_by(&self, dy: i64) -> Result<()>;

    async fn count(&self, selector: &str) -> Result<usize>;

    /// Capture at most `limit` nodes matching `selector`, each with the
    /// rendered text of its first `text_selector` match.
    async fn capture(
        &self,
        selector: &str,
        text_selector: &str,
        limit: usize,
    ) -> Result<CapturedItems>;

    /// Release the page and its browser. Must be idempotent.
    async fn close(&mut self);
}
