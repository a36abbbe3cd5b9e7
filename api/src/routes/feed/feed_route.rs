use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use catalog_store::FeedStatus;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    core::{app_state::AppState, project::resolve_project_id},
    error_handler::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub project_id: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedLoadRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct FeedLoadResponse {
    pub success: bool,
    pub products_count: usize,
    pub categories_count: usize,
    pub message: String,
}

/// Operator-triggered refresh: download, parse and reindex under the same
/// per-project lock the scheduler uses. Feed-level failures come back as
/// `success=false`, not as HTTP errors; the previous index stays intact.
pub async fn feed_load_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(p): Query<FeedQuery>,
    Json(body): Json<FeedLoadRequest>,
) -> AppResult<Json<FeedLoadResponse>> {
    if body.url.trim().is_empty() {
        return Err(AppError::BadRequest("feed url must not be empty".to_string()));
    }

    let project_id =
        resolve_project_id(&state, &headers, p.api_key.as_deref(), p.project_id.as_deref()).await?;

    if !state.store.acquire_feed_lock(&project_id).await? {
        return Ok(Json(FeedLoadResponse {
            success: false,
            products_count: 0,
            categories_count: 0,
            message: "feed refresh already in progress".to_string(),
        }));
    }

    let result = state
        .feed
        .run(&project_id, body.url.trim(), &state.indexer)
        .await;

    if let Err(err) = state.store.release_feed_lock(&project_id).await {
        warn!("feed_load_route: lock release failed: {err}");
    }

    let response = match result {
        Ok(outcome) => FeedLoadResponse {
            success: true,
            products_count: outcome.products_count,
            categories_count: outcome.categories_count,
            message: String::new(),
        },
        Err(err) => FeedLoadResponse {
            success: false,
            products_count: 0,
            categories_count: 0,
            message: err.to_string(),
        },
    };
    Ok(Json(response))
}

/// Read-only view of the last refresh outcome.
pub async fn feed_status_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(p): Query<FeedQuery>,
) -> AppResult<Json<FeedStatus>> {
    let project_id =
        resolve_project_id(&state, &headers, p.api_key.as_deref(), p.project_id.as_deref()).await?;
    let status = state.store.feed_status(&project_id).await?;
    Ok(Json(status))
}
