use feedgrab_common::NormalizedRecord;
use tracing::info;

use crate::error::Result;
use crate::store::ArticleStore;

/// Drop candidates whose url is already stored, keep order, then keep at
/// most `save_count`. The store is asked once for the whole candidate set.
pub async fn filter_new(
    store: &dyn ArticleStore,
    candidates: Vec<NormalizedRecord>,
    save_count: usize,
) -> Result<Vec<NormalizedRecord>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let urls: Vec<String> = candidates.iter().map(|c| c.url.clone()).collect();
    let existing = store.existing_urls(&urls).await?;

    let total = candidates.len();
    let mut fresh: Vec<NormalizedRecord> = candidates
        .into_iter()
        .filter(|c| !existing.contains(&c.url))
        .collect();
    let unseen = fresh.len();
    fresh.truncate(save_count);

    info!(
        candidates = total,
        known = total - unseen,
        accepted = fresh.len(),
        "dedup: filtered candidates"
    );
    Ok(fresh)
}
