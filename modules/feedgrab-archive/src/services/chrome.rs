// Chromium-backed ProfilePage. Wraps chrome_client; one process per launch.

use std::time::Duration;

use async_trait::async_trait;
use chrome_client::{ChromeClient, ChromeError, ChromeSession, LaunchOptions};
use feedgrab_common::Config;
use tracing::{info, warn};

use crate::error::{ArchiveError, Result};
use crate::page::{CapturedItem, CapturedItems, ProfilePage};
use crate::session::{BrowserLauncher, SessionCookies};

pub struct ChromeLauncher {
    client: ChromeClient,
}

impl ChromeLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self {
            client: ChromeClient::new(options),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(LaunchOptions {
            chrome_bin: config.chrome_bin.as_ref().map(Into::into),
            headless: config.chrome_headless,
            ..LaunchOptions::default()
        })
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self, cookies: &SessionCookies) -> Result<Box<dyn ProfilePage>> {
        let mut session = self.client.launch().await?;
        if let Err(e) = session.set_cookies(cookies.as_slice()).await {
            warn!(error = %e, "chrome: failed to install session cookies");
            session.close().await;
            return Err(match e {
                ChromeError::Cookie { .. } => ArchiveError::InvalidSession(e.to_string()),
                other => other.into(),
            });
        }
        info!(cookies = cookies.len(), "chrome: session replayed");
        Ok(Box::new(ChromeProfilePage { session }))
    }
}

struct ChromeProfilePage {
    session: ChromeSession,
}

#[async_trait]
impl ProfilePage for ChromeProfilePage {
    async fn goto_and_wait(&self, url: &str, marker: &str, timeout: Duration) -> Result<()> {
        self.session
            .goto_and_wait(url, marker, timeout)
            .await
            .map_err(|e| match e {
                ChromeError::Timeout { .. } => ArchiveError::NavigationTimeout {
                    url: url.to_string(),
                    marker: marker.to_string(),
                },
                other => other.into(),
            })
    }

    async fn scroll_by(&self, dy: i64) -> Result<()> {
        Ok(self.session.scroll_by(dy).await?)
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.session.count(selector).await?)
    }

    async fn capture(
        &self,
        selector: &str,
        text_selector: &str,
        limit: usize,
    ) -> Result<CapturedItems> {
        let items = self
            .session
            .capture_nodes(selector, text_selector, limit)
            .await?
            .into_iter()
            .map(|node| CapturedItem {
                html: node.html,
                text: node.text,
            })
            .collect();
        let base_url = self.session.current_url().await?;
        Ok(CapturedItems { base_url, items })
    }

    async fn close(&mut self) {
        self.session.close().await;
    }
}
