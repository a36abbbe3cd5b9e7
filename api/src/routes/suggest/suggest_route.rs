use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};

use crate::{
    core::{app_state::AppState, project::resolve_project_id},
    error_handler::{AppError, AppResult},
    routes::suggest::{
        suggest_request::SuggestRequest,
        suggest_response::{QuerySuggestion, SuggestBlock, SuggestResponse},
    },
};

pub async fn suggest_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(p): Query<SuggestRequest>,
) -> AppResult<Json<SuggestResponse>> {
    if p.q.is_empty() {
        return Err(AppError::BadRequest("query must not be empty".to_string()));
    }
    let limit = p.limit.unwrap_or(5);
    if limit < 1 || limit > 20 {
        return Err(AppError::BadRequest(
            "limit must be between 1 and 20".to_string(),
        ));
    }

    let project_id =
        resolve_project_id(&state, &headers, p.api_key.as_deref(), p.project_id.as_deref()).await?;

    let result = state
        .engine
        .suggest(
            &project_id,
            &p.q,
            limit,
            p.include_products.unwrap_or(true),
        )
        .await?;

    let queries = result
        .queries
        .into_iter()
        .take(state.cfg.suggest_queries_cap)
        .map(|suggestion| QuerySuggestion {
            text: suggestion.text,
            highlight: suggestion.highlight,
        })
        .collect();

    Ok(Json(SuggestResponse {
        suggestions: SuggestBlock {
            queries,
            categories: Vec::new(),
            products: result.products,
        },
    }))
}
