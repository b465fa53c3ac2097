use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedgrabError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid timestamp {value:?}: {reason}")]
    Timestamp { value: String, reason: String },
}
