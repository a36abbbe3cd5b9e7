use search_engine::SearchItem;
use serde::Serialize;

#[derive(Serialize)]
pub struct QuerySuggestion {
    pub text: String,
    pub highlight: String,
}

#[derive(Serialize)]
pub struct SuggestBlock {
    pub queries: Vec<QuerySuggestion>,
    /// Reserved for category suggestions; always empty in the current
    /// widget contract.
    pub categories: Vec<serde_json::Value>,
    pub products: Vec<SearchItem>,
}

#[derive(Serialize)]
pub struct SuggestResponse {
    pub suggestions: SuggestBlock,
}
