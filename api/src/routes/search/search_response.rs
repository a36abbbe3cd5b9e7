use search_engine::{RelatedItems, SearchItem};
use serde::Serialize;

#[derive(Serialize)]
pub struct SearchMeta {
    pub took_ms: u64,
    pub project_id: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
    pub total: usize,
    pub query: String,
    pub meta: SearchMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<RelatedItems>,
}
