use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::error;

use feedgrab_archive::{ArchiveError, RunOutcome};

use crate::AppState;

pub const DEFAULT_SAVE_COUNT: usize = 5;
pub const MAX_SAVE_COUNT: usize = 100;

#[derive(Deserialize)]
pub struct ScrapeParams {
    count: Option<usize>,
}

/// Scrape a profile and store up to `count` posts not seen before.
pub async fn api_scrape(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    params: Result<Query<ScrapeParams>, QueryRejection>,
) -> Response {
    let count = match params {
        Ok(Query(params)) => params.count.unwrap_or(DEFAULT_SAVE_COUNT),
        Err(rejection) => return invalid_count(rejection.body_text()),
    };
    if count == 0 || count > MAX_SAVE_COUNT {
        return invalid_count(format!("count was {count}"));
    }

    match state.pipeline.run(&username, count).await {
        Ok(RunOutcome::Ingested {
            new_records,
            articles,
        }) => Json(serde_json::json!({
            "message": "Scrape and save operation completed successfully.",
            "username": username,
            "newArticlesSaved": new_records,
            "articles": articles,
        }))
        .into_response(),
        Ok(RunOutcome::NoNewRecords { candidates: 0 }) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "message": "No posts found on the user's profile." })),
        )
            .into_response(),
        Ok(RunOutcome::NoNewRecords { .. }) => Json(serde_json::json!({
            "message": "Scraping complete. No new posts found.",
            "username": username,
        }))
        .into_response(),
        Err(ArchiveError::InvalidProfile(raw)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "Invalid username.",
                "details": format!("{raw:?} is not a valid profile handle"),
            })),
        )
            .into_response(),
        Err(e) => {
            error!(username = %username, error = %e, "Scrape failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Failed to scrape or save posts.",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

fn invalid_count(details: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": format!("count must be between 1 and {MAX_SAVE_COUNT}"),
            "details": details,
        })),
    )
        .into_response()
}
