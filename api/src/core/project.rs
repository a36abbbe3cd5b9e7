//! Tenant resolution for widget-facing requests.

use crate::core::app_state::AppState;
use crate::error_handler::AppResult;
use axum::http::HeaderMap;
use tracing::debug;

/// Reserved project every unidentified request lands on; an unknown API key
/// is a demo-quality caller, never a 500.
pub const DEMO_PROJECT: &str = "demo";

/// Resolves the tenant for a request.
///
/// Precedence: `X-API-Key` header, then the `api_key` query parameter, then
/// an explicit `project_id`; anything unresolvable falls back to the demo
/// project. Key lookups hit the KV cache first and fall through to the
/// relational store (see `DataStore::resolve_api_key`).
pub async fn resolve_project_id(
    state: &AppState,
    headers: &HeaderMap,
    api_key: Option<&str>,
    project_id: Option<&str>,
) -> AppResult<String> {
    let header_key = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .filter(|key| !key.is_empty());
    let key = header_key.or(api_key.filter(|key| !key.is_empty()));

    if let Some(key) = key {
        return match state.store.resolve_api_key(key).await? {
            Some(project_id) => Ok(project_id),
            None => {
                debug!("resolve_project_id: unknown api key, using demo project");
                Ok(DEMO_PROJECT.to_string())
            }
        };
    }

    Ok(project_id
        .filter(|id| !id.is_empty())
        .unwrap_or(DEMO_PROJECT)
        .to_string())
}
