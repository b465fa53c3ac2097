use std::path::PathBuf;

use crate::error::FeedgrabError;

/// Application configuration loaded from environment variables.
///
/// Passed explicitly into the pipeline and server at construction time;
/// nothing below reads the environment on its own.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Captured session
    pub cookies_path: PathBuf,
    pub cookies_inline: Option<String>,

    // Browser
    pub chrome_bin: Option<String>,
    pub chrome_headless: bool,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, FeedgrabError> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FeedgrabError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| FeedgrabError::Config("DATABASE_URL is required".to_string()))?;

        let web_port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| FeedgrabError::Config(format!("PORT must be a number, got {raw:?}")))?,
            None => 8000,
        };

        let chrome_headless = match lookup("CHROME_HEADLESS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| FeedgrabError::Config(format!("CHROME_HEADLESS must be true or false, got {raw:?}")))?,
            None => true,
        };

        Ok(Self {
            database_url,
            cookies_path: lookup("COOKIES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./cookies.json")),
            cookies_inline: lookup("TWITTER_COOKIES").filter(|v| !v.trim().is_empty()),
            chrome_bin: lookup("CHROME_BIN").filter(|v| !v.is_empty()),
            chrome_headless,
            web_host: lookup("WEB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port,
        })
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{}...({} chars)", head, val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  DATABASE_URL: {}", preview(&self.database_url));
        tracing::info!("  COOKIES_PATH: {}", self.cookies_path.display());
        tracing::info!(
            "  TWITTER_COOKIES: {}",
            self.cookies_inline.as_deref().map(preview).unwrap_or_else(|| "<not set>".to_string())
        );
        tracing::info!("  CHROME_BIN: {}", self.chrome_bin.as_deref().unwrap_or("<auto>"));
    }
}
