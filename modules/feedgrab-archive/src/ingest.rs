use feedgrab_common::{NormalizedRecord, StoredArticle};
use tracing::info;

use crate::error::Result;
use crate::store::ArticleStore;

/// Persist accepted records as articles, insert-if-absent by url, in one
/// batch. Returns the number newly inserted, which can be lower than the
/// number submitted when a concurrent run stored some of them first.
pub async fn ingest(
    store: &dyn ArticleStore,
    records: &[NormalizedRecord],
    profile: &str,
) -> Result<u64> {
    if records.is_empty() {
        return Ok(0);
    }

    let articles = records
        .iter()
        .map(|r| StoredArticle::from_record(r, profile))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let submitted = articles.len();
    let inserted = store.insert_absent(articles).await?;
    info!(profile, submitted, inserted, "ingest: batch written");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use feedgrab_common::MediaRef;

    use super::*;
    use crate::error::ArchiveError;
    use crate::store::MemoryArticleStore;

    fn record(url: &str, ts: &str) -> NormalizedRecord {
        NormalizedRecord {
            text: "We have liftoff".to_string(),
            url: url.to_string(),
            published_at: ts.to_string(),
            media: vec![MediaRef::video_post(url)],
        }
    }

    #[tokio::test]
    async fn writes_articles_with_provenance() {
        let store = MemoryArticleStore::new();
        let n = ingest(
            &store,
            &[record("https://twitter.com/nasa/status/1", "2024-05-01T12:00:00.000Z")],
            "nasa",
        )
        .await
        .unwrap();
        assert_eq!(n, 1);
        let article = store.get("https://twitter.com/nasa/status/1").unwrap();
        assert_eq!(article.source, "Twitter @nasa");
        assert_eq!(article.title, "We have liftoff");
        assert_eq!(article.media, vec![MediaRef::video_post("https://twitter.com/nasa/status/1")]);
    }

    #[tokio::test]
    async fn count_excludes_records_stored_by_someone_else() {
        let store = MemoryArticleStore::with_urls(["https://twitter.com/nasa/status/1"]);
        let n = ingest(
            &store,
            &[
                record("https://twitter.com/nasa/status/1", "2024-05-01T12:00:00.000Z"),
                record("https://twitter.com/nasa/status/2", "2024-05-02T12:00:00.000Z"),
            ],
            "nasa",
        )
        .await
        .unwrap();
        assert_eq!(n, 1);
        assert_eq!(store.write_batches(), 1);
    }

    #[tokio::test]
    async fn empty_input_writes_nothing() {
        let store = MemoryArticleStore::new();
        assert_eq!(ingest(&store, &[], "nasa").await.unwrap(), 0);
        assert_eq!(store.write_batches(), 0);
    }

    #[tokio::test]
    async fn write_failure_is_surfaced() {
        let store = MemoryArticleStore::new();
        store.fail_writes(true);
        let err = ingest(
            &store,
            &[record("https://twitter.com/nasa/status/1", "2024-05-01T12:00:00.000Z")],
            "nasa",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ArchiveError::Store(_)));
    }

    #[tokio::test]
    async fn unparseable_timestamp_aborts_before_writing() {
        let store = MemoryArticleStore::new();
        let err = ingest(&store, &[record("u", "not a time")], "nasa").await.unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidRecord(_)));
        assert_eq!(store.write_batches(), 0);
    }
}
