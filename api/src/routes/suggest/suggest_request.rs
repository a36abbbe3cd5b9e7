use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub q: String,
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    pub limit: Option<usize>,
    pub include_products: Option<bool>,
}
