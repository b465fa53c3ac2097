use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use feedgrab_archive::{
    ChromeLauncher, PgArticleStore, Pipeline, PipelineConfig, SessionSource,
};
use feedgrab_common::Config;

mod rest;

pub struct AppState {
    pub pipeline: Pipeline,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "feedgrab scraper is running." }))
        .route("/scrape/{username}", get(rest::api_scrape))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("feedgrab=info".parse()?)
                .add_directive("chrome_client=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;

    let store = PgArticleStore::connect(&config.database_url).await?;
    store.migrate().await?;

    let session = SessionSource::from_config(&config);
    if let Err(e) = session.load().await {
        warn!(error = %e, "Session cookies unavailable; scrape requests will fail until a session is captured");
    }

    let pipeline = Pipeline::new(
        PipelineConfig::default(),
        Arc::new(store),
        Arc::new(ChromeLauncher::from_config(&config)),
        session,
    );
    let state = Arc::new(AppState { pipeline });

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("feedgrab API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
