use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use search_engine::{SearchFilters, SearchOptions, SortOrder};
use tracing::warn;

use crate::{
    core::{app_state::AppState, project::resolve_project_id},
    error_handler::{AppError, AppResult},
    routes::search::{
        search_request::SearchRequest,
        search_response::{SearchMeta, SearchResponse},
    },
};

pub async fn search_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(p): Query<SearchRequest>,
) -> AppResult<Json<SearchResponse>> {
    if p.q.is_empty() {
        return Err(AppError::BadRequest("query must not be empty".to_string()));
    }
    let limit = p.limit.unwrap_or(10);
    if limit < 1 || limit > state.cfg.max_limit {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            state.cfg.max_limit
        )));
    }

    let project_id =
        resolve_project_id(&state, &headers, p.api_key.as_deref(), p.project_id.as_deref()).await?;

    let opts = SearchOptions {
        limit,
        offset: p.offset.unwrap_or(0),
        filters: SearchFilters {
            in_stock: p.in_stock,
            min_price: p.min_price,
            max_price: p.max_price,
            category: p.category.clone(),
        },
        sort: SortOrder::parse(p.sort.as_deref().unwrap_or("relevance")),
    };

    let result = state.engine.search(&project_id, &p.q, &opts).await?;

    // Related items need project settings; a relational outage here must not
    // take down a search that already answered from the KV side.
    let related = match state.store.get_project(&project_id).await {
        Ok(Some(project)) => state
            .engine
            .related_items(&project_id, &project.search_settings, &result.items)
            .await
            .unwrap_or_else(|err| {
                warn!("search_route: related items failed: {err}");
                None
            }),
        Ok(None) => None,
        Err(err) => {
            warn!("search_route: project settings unavailable: {err}");
            None
        }
    };

    state.store.log_search(&project_id, &p.q).await;

    Ok(Json(SearchResponse {
        items: result.items,
        total: result.total,
        query: result.query,
        meta: SearchMeta {
            took_ms: result.took_ms,
            project_id,
        },
        related,
    }))
}
