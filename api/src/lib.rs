//! HTTP surface: wires the stores, engines and scheduler together and
//! serves the widget-facing endpoints.

mod config;
mod core;
mod error_handler;
mod routes;

pub use config::ApiConfig;
pub use error_handler::{AppError, AppResult};

use crate::core::app_state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use catalog_store::{DataStore, Database, RedisStore, StoreConfig};
use feed_ingest::{FeedConfig, FeedManager, FeedScheduler};
use product_indexer::ProductIndexer;
use query_processor::{NGramGenerator, QueryProcessor};
use search_engine::SearchEngine;
use std::sync::Arc;
use tracing::{debug, info};

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_route))
        .route("/api/v1/search", get(routes::search::search_route::search_route))
        .route(
            "/api/v1/suggest",
            get(routes::suggest::suggest_route::suggest_route),
        )
        .route(
            "/api/v1/index",
            post(routes::index_products::index_route::index_route),
        )
        .route(
            "/api/v1/feed/load",
            post(routes::feed::feed_route::feed_load_route),
        )
        .route(
            "/api/v1/feed/status",
            get(routes::feed::feed_route::feed_status_route),
        )
        .route("/api/v1/click", post(routes::click::click_route::click_route))
        .with_state(state)
}

/// Connects the backends, starts the feed scheduler and serves the API
/// until the process is stopped.
///
/// # Errors
/// Fails when a backing store is unreachable at startup or the listener
/// cannot be bound.
pub async fn start() -> Result<(), AppError> {
    let cfg = ApiConfig::from_env();
    let store_cfg = StoreConfig::from_env();
    let feed_cfg = FeedConfig::from_env();

    if cfg.jwt_secret.is_some() {
        debug!("auth signing key configured (consumed by the auth surface)");
    }
    debug!("issued api keys use prefix {:?}", cfg.api_key_prefix);

    let kv = Arc::new(RedisStore::connect(&store_cfg).await?);
    let db = Database::connect(&store_cfg).await?;
    db.migrate().await?;
    let store = Arc::new(DataStore::new(kv, db.clone()));

    let processor = if cfg.extra_stopwords.is_empty() {
        QueryProcessor::default()
    } else {
        QueryProcessor::with_extra_stopwords(cfg.extra_stopwords.iter().cloned())
    };
    let ngrams = NGramGenerator::new(cfg.ngram_width);

    let engine = Arc::new(SearchEngine::new(store.kv(), processor.clone(), ngrams));
    let indexer = Arc::new(ProductIndexer::new(
        store.kv(),
        Some(db),
        processor,
        ngrams,
    ));
    let feed = Arc::new(FeedManager::new(Arc::clone(&store), &feed_cfg).map_err(feed_boot_error)?);

    FeedScheduler::new(
        Arc::clone(&store),
        Arc::clone(&feed),
        Arc::clone(&indexer),
        feed_cfg,
    )
    .spawn();

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        store,
        engine,
        indexer,
        feed,
    });

    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(AppError::Bind)?;
    info!("api: listening on {addr}");

    axum::serve(listener, router(state))
        .await
        .map_err(AppError::Server)?;
    Ok(())
}

fn feed_boot_error(err: feed_ingest::FeedError) -> AppError {
    AppError::Internal(format!("feed manager init failed: {err}"))
}
