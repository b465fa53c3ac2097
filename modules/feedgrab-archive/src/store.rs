// Article persistence: existence lookup by url set and batched
// insert-if-absent. Uniqueness on `url` is the only guarantee relied upon.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedgrab_common::StoredArticle;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::{ArchiveError, Result};

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// The subset of `urls` already stored. One round-trip per call.
    async fn existing_urls(&self, urls: &[String]) -> Result<HashSet<String>>;

    /// Insert every article whose url is not yet stored, in one batch.
    /// Returns how many were actually inserted.
    async fn insert_absent(&self, articles: Vec<StoredArticle>) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// PgArticleStore (production)
// ---------------------------------------------------------------------------

pub struct PgArticleStore {
    pool: PgPool,
}

impl PgArticleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        info!("store: connected to Postgres");
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ArchiveError::Database(e.into()))?;
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn existing_urls(&self, urls: &[String]) -> Result<HashSet<String>> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT url FROM articles
            WHERE url = ANY($1)
            "#,
        )
        .bind(urls)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn insert_absent(&self, articles: Vec<StoredArticle>) -> Result<u64> {
        if articles.is_empty() {
            return Ok(0);
        }

        let n = articles.len();
        let mut urls = Vec::with_capacity(n);
        let mut titles = Vec::with_capacity(n);
        let mut summaries = Vec::with_capacity(n);
        let mut bodies = Vec::with_capacity(n);
        let mut sources = Vec::with_capacity(n);
        let mut created_by = Vec::with_capacity(n);
        let mut published: Vec<DateTime<Utc>> = Vec::with_capacity(n);
        let mut media = Vec::with_capacity(n);

        for a in articles {
            media.push(serde_json::to_value(&a.media)?);
            urls.push(a.url);
            titles.push(a.title);
            summaries.push(a.summary);
            bodies.push(a.body);
            sources.push(a.source);
            created_by.push(a.created_by);
            published.push(a.published_at);
        }

        // A single statement: the whole batch applies or none of it does.
        let result = sqlx::query(
            r#"
            INSERT INTO articles
                (url, title, summary, body, source, created_by, published_at, media)
            SELECT * FROM UNNEST(
                $1::text[], $2::text[], $3::text[], $4::text[],
                $5::text[], $6::text[], $7::timestamptz[], $8::jsonb[]
            )
            ON CONFLICT (url) DO NOTHING
            "#,
        )
        .bind(&urls)
        .bind(&titles)
        .bind(&summaries)
        .bind(&bodies)
        .bind(&sources)
        .bind(&created_by)
        .bind(&published)
        .bind(&media)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected();
        debug!(submitted = n, inserted, "store: insert-if-absent batch applied");
        Ok(inserted)
    }
}

// ---------------------------------------------------------------------------
// MemoryArticleStore (tests, local runs)
// ---------------------------------------------------------------------------

/// In-process store with the same insert-if-absent semantics.
#[derive(Default)]
pub struct MemoryArticleStore {
    articles: Mutex<HashMap<String, StoredArticle>>,
    existence_queries: AtomicUsize,
    write_batches: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with articles whose only meaningful field is the url.
    pub fn with_urls<'a>(urls: impl IntoIterator<Item = &'a str>) -> Self {
        let articles = urls
            .into_iter()
            .map(|url| {
                let article = StoredArticle {
                    title: String::new(),
                    summary: String::new(),
                    body: String::new(),
                    url: url.to_string(),
                    source: "seed".to_string(),
                    created_by: "seed".to_string(),
                    published_at: DateTime::<Utc>::UNIX_EPOCH,
                    media: Vec::new(),
                };
                (url.to_string(), article)
            })
            .collect();
        Self {
            articles: Mutex::new(articles),
            ..Self::default()
        }
    }

    fn locked(&self) -> Result<MutexGuard<'_, HashMap<String, StoredArticle>>> {
        self.articles
            .lock()
            .map_err(|_| ArchiveError::Store("in-memory store lock poisoned".to_string()))
    }

    /// Read-only view for inspection; a poisoned lock still holds valid data.
    fn snapshot(&self) -> MutexGuard<'_, HashMap<String, StoredArticle>> {
        self.articles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent write fail, as a broken connection would.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, url: &str) -> Option<StoredArticle> {
        self.snapshot().get(url).cloned()
    }

    pub fn existence_queries(&self) -> usize {
        self.existence_queries.load(Ordering::SeqCst)
    }

    pub fn write_batches(&self) -> usize {
        self.write_batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn existing_urls(&self, urls: &[String]) -> Result<HashSet<String>> {
        self.existence_queries.fetch_add(1, Ordering::SeqCst);
        let articles = self.locked()?;
        Ok(urls
            .iter()
            .filter(|u| articles.contains_key(*u))
            .cloned()
            .collect())
    }

    async fn insert_absent(&self, articles: Vec<StoredArticle>) -> Result<u64> {
        self.write_batches.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ArchiveError::Store("write rejected".to_string()));
        }

        let mut stored = self.locked()?;
        let mut inserted = 0;
        for article in articles {
            if !stored.contains_key(&article.url) {
                stored.insert(article.url.clone(), article);
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
