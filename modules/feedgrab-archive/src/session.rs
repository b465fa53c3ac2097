// Session replay: load the captured cookie artifact, validate the profile
// identifier, and position a freshly launched page on the profile stream.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrome_client::Cookie;
use feedgrab_common::Config;
use tracing::{debug, info};

use crate::error::{ArchiveError, Result};
use crate::page::ProfilePage;

/// Marker that appears once the profile's content stream has rendered.
pub const CONTENT_MARKER: &str = "div[data-testid='cellInnerDiv']";

/// Public base of profile pages.
pub const PROFILE_BASE_URL: &str = "https://x.com";

const MAX_PROFILE_LEN: usize = 15;

/// A well-formed, non-empty set of captured session cookies.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCookies(Vec<Cookie>);

impl SessionCookies {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let cookies: Vec<Cookie> = serde_json::from_slice(bytes)
            .map_err(|e| ArchiveError::InvalidSession(e.to_string()))?;

        if cookies.is_empty() {
            return Err(ArchiveError::InvalidSession("cookie set is empty".to_string()));
        }
        if let Some(bad) = cookies
            .iter()
            .find(|c| c.name.trim().is_empty() || c.domain.trim().is_empty())
        {
            return Err(ArchiveError::InvalidSession(format!(
                "cookie {:?} is missing a name or domain",
                bad.name
            )));
        }

        Ok(Self(cookies))
    }

    pub fn as_slice(&self) -> &[Cookie] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Where the captured session comes from. Inline JSON wins over the file.
#[derive(Debug, Clone)]
pub struct SessionSource {
    pub cookies_path: PathBuf,
    pub inline: Option<String>,
}

impl SessionSource {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cookies_path: config.cookies_path.clone(),
            inline: config.cookies_inline.clone(),
        }
    }

    pub fn inline(json: impl Into<String>) -> Self {
        Self {
            cookies_path: PathBuf::new(),
            inline: Some(json.into()),
        }
    }

    /// Load and validate the artifact. Never retried: a missing or malformed
    /// session needs a fresh interactive capture.
    pub async fn load(&self) -> Result<SessionCookies> {
        if let Some(ref json) = self.inline {
            debug!("session: using inline cookies");
            return SessionCookies::from_json(json.as_bytes());
        }

        let bytes = match tokio::fs::read(&self.cookies_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArchiveError::MissingSession(
                    self.cookies_path.display().to_string(),
                ));
            }
            Err(e) => {
                return Err(ArchiveError::InvalidSession(format!(
                    "failed to read {}: {e}",
                    self.cookies_path.display()
                )));
            }
        };
        debug!(path = %self.cookies_path.display(), "session: read cookie file");
        SessionCookies::from_json(&bytes)
    }
}

/// Launches an isolated browser context authenticated with the given cookies.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, cookies: &SessionCookies) -> Result<Box<dyn ProfilePage>>;
}

/// Accept `name` or `@name`; handles are 1-15 characters of `[A-Za-z0-9_]`.
pub fn validate_profile(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let handle = trimmed.strip_prefix('@').unwrap_or(trimmed);
    let valid = !handle.is_empty()
        && handle.len() <= MAX_PROFILE_LEN
        && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(handle.to_string())
    } else {
        Err(ArchiveError::InvalidProfile(raw.to_string()))
    }
}

pub fn profile_url(profile: &str) -> String {
    format!("{PROFILE_BASE_URL}/{profile}")
}

/// Navigate to the profile's content stream and wait for it to render.
pub async fn open_profile(page: &dyn ProfilePage, profile: &str, timeout: Duration) -> Result<()> {
    let url = profile_url(profile);
    info!(%url, "session: opening profile");
    page.goto_and_wait(&url, CONTENT_MARKER, timeout).await
}
