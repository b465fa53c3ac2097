// Test mocks for the pipeline's browser boundary.
//
// MockLauncher (BrowserLauncher) hands out MockPages that "render" a fixed
// set of item markup progressively as the page is scrolled. Pair with
// MemoryArticleStore for the store boundary.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ArchiveError, Result};
use crate::page::{CapturedItem, CapturedItems, ProfilePage};
use crate::pipeline::PipelineConfig;
use crate::scroll::ScrollPolicy;
use crate::session::{BrowserLauncher, SessionCookies};

pub const COOKIES: &str =
    r#"[{"name":"auth_token","value":"t","domain":".x.com","path":"/","httpOnly":true,"secure":true}]"#;

/// Default policies with no settle delay.
pub fn fast_config() -> PipelineConfig {
    PipelineConfig {
        scroll: ScrollPolicy {
            settle_delay: Duration::ZERO,
            ..ScrollPolicy::default()
        },
        ..PipelineConfig::default()
    }
}

/// Markup for one post with a relative permalink, as the live page renders it.
pub fn post(profile: &str, id: u64, datetime: &str) -> String {
    format!(
        r#"<article data-testid="tweet">
            <a href="/{profile}/status/{id}"><time datetime="{datetime}">t</time></a>
            <div data-testid="tweetText">post {id}</div>
            <div data-testid="tweetPhoto"><img src="https://pbs.twimg.com/media/{id}.jpg"></div>
        </article>"#
    )
}

/// Posts 1..=n, newest last in document order (ids grow with time).
pub fn posts(profile: &str, n: u64) -> Vec<String> {
    (1..=n)
        .map(|i| post(profile, i, &format!("2024-05-{:02}T12:00:00.000Z", i)))
        .collect()
}

#[derive(Default)]
pub struct PageStats {
    pub launches: AtomicUsize,
    pub scrolls: AtomicUsize,
    pub closes: AtomicUsize,
}

impl PageStats {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct MockLauncher {
    pub items: Vec<String>,
    pub initial: usize,
    pub per_scroll: usize,
    pub marker_appears: bool,
    pub stats: Arc<PageStats>,
}

impl MockLauncher {
    pub fn new(items: Vec<String>) -> Self {
        Self {
            items,
            initial: usize::MAX,
            per_scroll: 0,
            marker_appears: true,
            stats: Arc::new(PageStats::default()),
        }
    }

    /// Render `initial` items up front and `per_scroll` more per scroll.
    pub fn lazy(mut self, initial: usize, per_scroll: usize) -> Self {
        self.initial = initial;
        self.per_scroll = per_scroll;
        self
    }

    pub fn never_renders(mut self) -> Self {
        self.marker_appears = false;
        self
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self, cookies: &SessionCookies) -> Result<Box<dyn ProfilePage>> {
        assert!(!cookies.is_empty());
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPage {
            launcher: self.clone(),
            scrolls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct MockPage {
    launcher: MockLauncher,
    scrolls: AtomicUsize,
    closed: AtomicBool,
}

impl MockPage {
    fn visible(&self) -> usize {
        let scrolls = self.scrolls.load(Ordering::SeqCst);
        self.launcher
            .initial
            .saturating_add(scrolls.saturating_mul(self.launcher.per_scroll))
            .min(self.launcher.items.len())
    }
}

#[async_trait]
impl ProfilePage for MockPage {
    async fn goto_and_wait(&self, url: &str, marker: &str, _timeout: Duration) -> Result<()> {
        if self.launcher.marker_appears {
            Ok(())
        } else {
            Err(ArchiveError::NavigationTimeout {
                url: url.to_string(),
                marker: marker.to_string(),
            })
        }
    }

    async fn scroll_by(&self, _dy: i64) -> Result<()> {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        self.launcher.stats.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn count(&self, _selector: &str) -> Result<usize> {
        Ok(self.visible())
    }

    async fn capture(
        &self,
        _selector: &str,
        _text_selector: &str,
        limit: usize,
    ) -> Result<CapturedItems> {
        let n = self.visible().min(limit);
        Ok(CapturedItems {
            base_url: Some("https://x.com/nasa".to_string()),
            items: self.launcher.items[..n]
                .iter()
                .map(CapturedItem::markup)
                .collect(),
        })
    }

    async fn close(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.launcher.stats.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
