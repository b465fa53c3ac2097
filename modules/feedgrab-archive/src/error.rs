use feedgrab_common::FeedgrabError;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Session cookies not found at {0}. Capture a session first or set TWITTER_COOKIES")]
    MissingSession(String),

    #[error("Invalid session cookies: {0}")]
    InvalidSession(String),

    #[error("Invalid profile identifier: {0:?}")]
    InvalidProfile(String),

    #[error("Navigation timed out waiting for {marker} on {url}")]
    NavigationTimeout { url: String, marker: String },

    #[error("Browser error: {0}")]
    Browser(#[from] chrome_client::ChromeError),

    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] FeedgrabError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(String),
}
