// Run orchestration: session -> scroll -> extract -> normalize -> dedup -> ingest.
//
// Run-level failures (session, navigation, browser, store) propagate to the
// caller. Per-item problems were already absorbed by extraction. The page is
// closed before any result leaves `run`.

use std::sync::Arc;
use std::time::Duration;

use feedgrab_common::{NormalizedRecord, RawRecord};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::dedup::filter_new;
use crate::error::Result;
use crate::extract::{sort_newest_first, ITEM_SELECTOR, TEXT_BODY};
use crate::html::extract_captured;
use crate::ingest::ingest;
use crate::normalize::HostMap;
use crate::page::ProfilePage;
use crate::scroll::{converge, ScrollPolicy};
use crate::session::{open_profile, validate_profile, BrowserLauncher, SessionSource};
use crate::store::ArticleStore;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub scroll: ScrollPolicy,
    pub navigation_timeout: Duration,
    /// Extra items fetched beyond the save count to make up for duplicates.
    pub overfetch: usize,
    pub host_map: HostMap,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scroll: ScrollPolicy::default(),
            navigation_timeout: Duration::from_secs(60),
            overfetch: 20,
            host_map: HostMap::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    SessionReady,
    Converging,
    Extracted,
    Normalized,
    Filtered,
    Ingested,
    NoNewRecords,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Ingested {
        /// Newly inserted; may be below `articles.len()` after losing a race.
        new_records: u64,
        articles: Vec<NormalizedRecord>,
    },
    /// Nothing left after dedup. `candidates` is zero when the profile
    /// rendered no usable items at all.
    NoNewRecords { candidates: usize },
}

impl RunOutcome {
    pub fn state(&self) -> RunState {
        match self {
            RunOutcome::Ingested { .. } => RunState::Ingested,
            RunOutcome::NoNewRecords { .. } => RunState::NoNewRecords,
        }
    }
}

fn enter(state: RunState) {
    info!(?state, "run: state");
}

pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<dyn ArticleStore>,
    launcher: Arc<dyn BrowserLauncher>,
    session: SessionSource,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn ArticleStore>,
        launcher: Arc<dyn BrowserLauncher>,
        session: SessionSource,
    ) -> Self {
        Self {
            config,
            store,
            launcher,
            session,
        }
    }

    /// One end-to-end run for `profile`, persisting at most `save_count` new records.
    pub async fn run(&self, profile: &str, save_count: usize) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, profile, save_count);

        async {
            enter(RunState::Idle);
            match self.execute(profile, save_count).await {
                Ok(outcome) => {
                    enter(outcome.state());
                    Ok(outcome)
                }
                Err(e) => {
                    warn!(state = ?RunState::Failed, error = %e, "run: failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, profile: &str, save_count: usize) -> Result<RunOutcome> {
        let profile = validate_profile(profile)?;
        let cookies = self.session.load().await?;
        let fetch_count = save_count + self.config.overfetch;

        let mut page = self.launcher.launch(&cookies).await?;
        let collected = self.collect(page.as_ref(), &profile, fetch_count).await;
        page.close().await;
        let raw = collected?;

        let candidates: Vec<NormalizedRecord> = raw
            .into_iter()
            .map(|r| self.config.host_map.normalize(r))
            .collect();
        enter(RunState::Normalized);

        let total = candidates.len();
        let accepted = filter_new(self.store.as_ref(), candidates, save_count).await?;
        enter(RunState::Filtered);

        if accepted.is_empty() {
            return Ok(RunOutcome::NoNewRecords { candidates: total });
        }

        let new_records = ingest(self.store.as_ref(), &accepted, &profile).await?;
        Ok(RunOutcome::Ingested {
            new_records,
            articles: accepted,
        })
    }

    /// Browser-side stages. The caller owns closing the page.
    async fn collect(
        &self,
        page: &dyn ProfilePage,
        profile: &str,
        fetch_count: usize,
    ) -> Result<Vec<RawRecord>> {
        open_profile(page, profile, self.config.navigation_timeout).await?;
        enter(RunState::SessionReady);

        enter(RunState::Converging);
        let convergence = converge(page, ITEM_SELECTOR, fetch_count, &self.config.scroll).await?;
        info!(
            rendered = convergence.rendered,
            scrolls = convergence.scrolls,
            converged = convergence.converged,
            "run: scrolling finished"
        );

        let captured = page.capture(ITEM_SELECTOR, TEXT_BODY, fetch_count).await?;
        let mut records = extract_captured(&captured, fetch_count);
        sort_newest_first(&mut records);
        info!(extracted = records.len(), "run: items extracted");
        enter(RunState::Extracted);

        Ok(records)
    }
}
