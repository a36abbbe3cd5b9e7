//! Result records returned by the engines.

use catalog_store::Product;
use serde::Serialize;

/// One ranked product with its accumulated relevance score
/// (rounded to 2 decimals on the way out).
#[derive(Debug, Clone, Serialize)]
pub struct SearchItem {
    #[serde(flatten)]
    pub product: Product,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub total: usize,
    pub items: Vec<SearchItem>,
    pub took_ms: u64,
}

impl SearchResult {
    pub fn empty(query: &str, took_ms: u64) -> Self {
        Self {
            query: query.to_string(),
            total: 0,
            items: Vec::new(),
            took_ms,
        }
    }
}

/// Secondary result block sharing one field value with the top hit.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedItems {
    pub field: String,
    pub value: String,
    pub items: Vec<Product>,
}

/// One autocomplete suggestion with its popularity count and the
/// widget-ready rendering (matched prefix wrapped in `<b>` tags).
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub text: String,
    pub highlight: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestResult {
    pub prefix: String,
    pub queries: Vec<Suggestion>,
    pub products: Vec<SearchItem>,
}

/// Requested result window and post-retrieval constraints.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub offset: usize,
    pub filters: SearchFilters,
    pub sort: SortOrder,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
            filters: SearchFilters::default(),
            sort: SortOrder::Relevance,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub in_stock: Option<bool>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Popular,
}

impl SortOrder {
    /// Lenient parse; unknown values fall back to relevance.
    pub fn parse(value: &str) -> Self {
        match value {
            "price_asc" => SortOrder::PriceAsc,
            "price_desc" => SortOrder::PriceDesc,
            "popular" => SortOrder::Popular,
            _ => SortOrder::Relevance,
        }
    }
}
