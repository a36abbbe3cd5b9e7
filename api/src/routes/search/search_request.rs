use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub q: String,
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub in_stock: Option<bool>,
    pub category: Option<String>,
    pub sort: Option<String>,
}
