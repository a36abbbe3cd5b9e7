use crate::config::ApiConfig;
use catalog_store::DataStore;
use feed_ingest::FeedManager;
use product_indexer::ProductIndexer;
use search_engine::SearchEngine;
use std::sync::Arc;

/// Shared state for handlers.
pub struct AppState {
    pub cfg: ApiConfig,
    pub store: Arc<DataStore>,
    pub engine: Arc<SearchEngine>,
    pub indexer: Arc<ProductIndexer>,
    pub feed: Arc<FeedManager>,
}
