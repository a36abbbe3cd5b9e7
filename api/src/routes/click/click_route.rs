use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};

use crate::{
    core::{app_state::AppState, project::resolve_project_id},
    error_handler::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct ClickQuery {
    pub project_id: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    pub product_id: String,
    #[serde(default)]
    pub query: String,
}

#[derive(Serialize)]
pub struct ClickResponse {
    pub success: bool,
}

/// Widget click tracking; feeds the popular-products and converting-queries
/// counters.
pub async fn click_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(p): Query<ClickQuery>,
    Json(body): Json<ClickRequest>,
) -> AppResult<Json<ClickResponse>> {
    if body.product_id.is_empty() {
        return Err(AppError::BadRequest("product_id must not be empty".to_string()));
    }
    let project_id =
        resolve_project_id(&state, &headers, p.api_key.as_deref(), p.project_id.as_deref()).await?;
    state
        .store
        .log_click(&project_id, &body.product_id, &body.query)
        .await;
    Ok(Json(ClickResponse { success: true }))
}
