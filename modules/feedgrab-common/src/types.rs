use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FeedgrabError;

// --- Media ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    /// Native video player. The url is the nearest addressable permalink,
    /// since video pages cannot be deep-linked.
    VideoPost,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::VideoPost => write!(f, "video_post"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    #[serde(rename = "mediaType")]
    pub kind: MediaKind,
    pub url: String,
}

impl MediaRef {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            url: url.into(),
        }
    }

    pub fn video_post(url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::VideoPost,
            url: url.into(),
        }
    }
}

// --- Records ---

/// A post as extracted from the rendered page.
///
/// `url` and `published_at` are never empty: nodes without a permalink or
/// timestamp are dropped during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub text: String,
    pub url: String,
    /// ISO-8601 timestamp exactly as rendered in the page's `datetime` attribute.
    pub published_at: String,
    pub media: Vec<MediaRef>,
}

/// A record whose permalink and media urls have been rewritten to the
/// canonical public host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub text: String,
    pub url: String,
    pub published_at: String,
    pub media: Vec<MediaRef>,
}

/// Length, in characters, of the derived article title.
pub const TITLE_MAX_CHARS: usize = 150;

/// The document persisted per distinct `url`. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArticle {
    pub title: String,
    pub summary: String,
    pub body: String,
    pub url: String,
    pub source: String,
    pub created_by: String,
    pub published_at: DateTime<Utc>,
    pub media: Vec<MediaRef>,
}

impl StoredArticle {
    /// Build the storage document for an accepted record.
    pub fn from_record(record: &NormalizedRecord, profile: &str) -> Result<Self, FeedgrabError> {
        Ok(Self {
            title: derive_title(&record.text),
            summary: record.text.clone(),
            body: record.text.clone(),
            url: record.url.clone(),
            source: provenance_label(profile),
            created_by: "twitter".to_string(),
            published_at: parse_timestamp(&record.published_at)?,
            media: record.media.clone(),
        })
    }
}

/// Provenance label recorded on every article ingested for `profile`.
pub fn provenance_label(profile: &str) -> String {
    format!("Twitter @{profile}")
}

/// First 150 characters of `text`, with an ellipsis when truncated.
pub fn derive_title(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Parse an RFC 3339 timestamp (`Z` or numeric offset) into UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, FeedgrabError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FeedgrabError::Timestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}
