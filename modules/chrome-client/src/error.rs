use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChromeError>;

#[derive(Debug, Error)]
pub enum ChromeError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("DevTools error: {0}")]
    Cdp(String),

    #[error("Timed out after {seconds}s waiting for {what}")]
    Timeout { what: String, seconds: u64 },

    #[error("Script returned unexpected value: {0}")]
    Script(String),

    #[error("Invalid cookie {name:?}: {reason}")]
    Cookie { name: String, reason: String },

    #[error("Session already closed")]
    Closed,
}

impl From<chromiumoxide::error::CdpError> for ChromeError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ChromeError::Cdp(err.to_string())
    }
}

impl From<serde_json::Error> for ChromeError {
    fn from(err: serde_json::Error) -> Self {
        ChromeError::Script(err.to_string())
    }
}
