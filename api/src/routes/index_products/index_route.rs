use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use catalog_store::Product;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    core::{app_state::AppState, project::resolve_project_id},
    error_handler::AppResult,
};

#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    pub project_id: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Serialize)]
pub struct IndexResponse {
    pub indexed: usize,
}

/// Direct indexing: full replacement of the project's product set from the
/// request body. Authorization is enforced by the surrounding surface.
pub async fn index_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(p): Query<IndexRequest>,
    Json(products): Json<Vec<Product>>,
) -> AppResult<Json<IndexResponse>> {
    let project_id =
        resolve_project_id(&state, &headers, p.api_key.as_deref(), p.project_id.as_deref()).await?;

    let indexed = state.indexer.index_products(&project_id, &products).await?;

    if let Err(err) = state
        .store
        .update_products_count(&project_id, indexed as i64)
        .await
    {
        warn!("index_route: products_count update failed: {err}");
    }

    Ok(Json(IndexResponse { indexed }))
}
