//! End-to-end runs against a scripted page and the in-memory store.

use std::sync::Arc;

use feedgrab_archive::{
    ArchiveError, ArticleStore, MemoryArticleStore, Pipeline, RunOutcome, RunState, SessionSource,
};
use feedgrab_archive::testing::{fast_config, posts, MockLauncher, COOKIES};

fn pipeline(store: Arc<MemoryArticleStore>, launcher: MockLauncher) -> Pipeline {
    Pipeline::new(
        fast_config(),
        store as Arc<dyn ArticleStore>,
        Arc::new(launcher),
        SessionSource::inline(COOKIES),
    )
}

fn ingested(outcome: RunOutcome) -> (u64, Vec<String>) {
    match outcome {
        RunOutcome::Ingested {
            new_records,
            articles,
        } => (new_records, articles.into_iter().map(|a| a.url).collect()),
        other => panic!("expected Ingested, got {other:?}"),
    }
}

#[tokio::test]
async fn second_run_over_same_content_inserts_nothing() {
    let store = Arc::new(MemoryArticleStore::new());
    let launcher = MockLauncher::new(posts("nasa", 5));
    let pipeline = pipeline(store.clone(), launcher);

    let (first, _) = ingested(pipeline.run("nasa", 10).await.unwrap());
    assert_eq!(first, 5);
    assert_eq!(store.len(), 5);

    let second = pipeline.run("nasa", 10).await.unwrap();
    assert_eq!(second, RunOutcome::NoNewRecords { candidates: 5 });
    assert_eq!(second.state(), RunState::NoNewRecords);
    assert_eq!(store.len(), 5);
}

#[tokio::test]
async fn saves_exactly_the_requested_count_newest_first() {
    let store = Arc::new(MemoryArticleStore::new());
    let pipeline = pipeline(store.clone(), MockLauncher::new(posts("nasa", 8)));

    let (new_records, urls) = ingested(pipeline.run("nasa", 3).await.unwrap());
    assert_eq!(new_records, 3);
    assert_eq!(
        urls,
        vec![
            "https://twitter.com/nasa/status/8",
            "https://twitter.com/nasa/status/7",
            "https://twitter.com/nasa/status/6",
        ]
    );
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn follow_up_run_picks_up_the_next_unseen_posts() {
    let store = Arc::new(MemoryArticleStore::new());
    let pipeline = pipeline(store.clone(), MockLauncher::new(posts("nasa", 8)));

    pipeline.run("nasa", 3).await.unwrap();
    let (new_records, urls) = ingested(pipeline.run("nasa", 3).await.unwrap());
    assert_eq!(new_records, 3);
    assert_eq!(urls[0], "https://twitter.com/nasa/status/5");
    assert_eq!(store.len(), 6);
}

#[tokio::test]
async fn stored_articles_use_canonical_host_everywhere() {
    let store = Arc::new(MemoryArticleStore::new());
    let pipeline = pipeline(store.clone(), MockLauncher::new(posts("nasa", 1)));

    pipeline.run("@nasa", 5).await.unwrap();
    let article = store.get("https://twitter.com/nasa/status/1").expect("stored");
    assert_eq!(article.source, "Twitter @nasa");
    assert_eq!(article.media[0].url, "https://pbs.twimg.com/media/1.jpg");
}

#[tokio::test]
async fn empty_profile_reports_no_candidates() {
    let store = Arc::new(MemoryArticleStore::new());
    let launcher = MockLauncher::new(Vec::new());
    let stats = launcher.stats.clone();
    let pipeline = pipeline(store.clone(), launcher);

    let outcome = pipeline.run("nasa", 5).await.unwrap();
    assert_eq!(outcome, RunOutcome::NoNewRecords { candidates: 0 });
    assert_eq!(store.existence_queries(), 0);
    assert_eq!(stats.closes(), 1);
}

#[tokio::test]
async fn stalled_page_gives_up_after_ten_scrolls_and_keeps_what_rendered() {
    let store = Arc::new(MemoryArticleStore::new());
    let launcher = MockLauncher::new(posts("nasa", 4)).lazy(2, 0);
    let stats = launcher.stats.clone();
    let pipeline = pipeline(store.clone(), launcher);

    let (new_records, _) = ingested(pipeline.run("nasa", 5).await.unwrap());
    assert_eq!(stats.scrolls(), 10);
    assert_eq!(new_records, 2);
}

#[tokio::test]
async fn lazy_page_is_scrolled_until_enough_items_render() {
    let store = Arc::new(MemoryArticleStore::new());
    let launcher = MockLauncher::new(posts("nasa", 30)).lazy(5, 10);
    let stats = launcher.stats.clone();
    let pipeline = pipeline(store.clone(), launcher);

    // save 5 + overfetch 20 = 25 items wanted: 5 -> 15 -> 25.
    let (new_records, _) = ingested(pipeline.run("nasa", 5).await.unwrap());
    assert_eq!(stats.scrolls(), 2);
    assert_eq!(new_records, 5);
}

#[tokio::test]
async fn navigation_timeout_fails_the_run_and_releases_the_page() {
    let store = Arc::new(MemoryArticleStore::new());
    let launcher = MockLauncher::new(posts("nasa", 3)).never_renders();
    let stats = launcher.stats.clone();
    let pipeline = pipeline(store.clone(), launcher);

    let err = pipeline.run("nasa", 5).await.unwrap_err();
    assert!(matches!(err, ArchiveError::NavigationTimeout { .. }));
    assert_eq!(stats.closes(), 1);
    assert!(store.is_empty());
}

#[tokio::test]
async fn store_failure_fails_the_run_after_releasing_the_page() {
    let store = Arc::new(MemoryArticleStore::new());
    store.fail_writes(true);
    let launcher = MockLauncher::new(posts("nasa", 3));
    let stats = launcher.stats.clone();
    let pipeline = pipeline(store.clone(), launcher);

    let err = pipeline.run("nasa", 5).await.unwrap_err();
    assert!(matches!(err, ArchiveError::Store(_)));
    assert_eq!(stats.closes(), 1);
}

#[tokio::test]
async fn missing_session_fails_before_launching_a_browser() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = MockLauncher::new(posts("nasa", 3));
    let stats = launcher.stats.clone();
    let pipeline = Pipeline::new(
        fast_config(),
        Arc::new(MemoryArticleStore::new()),
        Arc::new(launcher),
        SessionSource {
            cookies_path: dir.path().join("cookies.json"),
            inline: None,
        },
    );

    let err = pipeline.run("nasa", 5).await.unwrap_err();
    assert!(matches!(err, ArchiveError::MissingSession(_)));
    assert_eq!(stats.launches(), 0);
}

#[tokio::test]
async fn invalid_profile_fails_before_launching_a_browser() {
    let launcher = MockLauncher::new(posts("nasa", 3));
    let stats = launcher.stats.clone();
    let pipeline = pipeline(Arc::new(MemoryArticleStore::new()), launcher);

    let err = pipeline.run("../admin", 5).await.unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidProfile(_)));
    assert_eq!(stats.launches(), 0);
}

#[tokio::test]
async fn concurrent_runs_store_each_post_once() {
    let store = Arc::new(MemoryArticleStore::new());
    let a = pipeline(store.clone(), MockLauncher::new(posts("nasa", 6)));
    let b = pipeline(store.clone(), MockLauncher::new(posts("nasa", 6)));

    let (ra, rb) = tokio::join!(a.run("nasa", 10), b.run("nasa", 10));
    let inserted: u64 = [ra.unwrap(), rb.unwrap()]
        .into_iter()
        .map(|o| match o {
            RunOutcome::Ingested { new_records, .. } => new_records,
            RunOutcome::NoNewRecords { .. } => 0,
        })
        .sum();
    assert_eq!(inserted, 6);
    assert_eq!(store.len(), 6);
}
