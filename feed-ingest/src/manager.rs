//! Feed manager: download -> parse -> index, publishing status transitions
//! on `project:{p}:feed` along the way.
//!
//! On any failure the previously indexed generation stays untouched; only
//! the status hash records the error.

use crate::config::FeedConfig;
use crate::errors::FeedError;
use crate::fetch::FeedFetcher;
use crate::parser::{FeedParser, ParsedFeed};
use catalog_store::{DataStore, FeedState, FeedStatus, Product};
use chrono::Utc;
use product_indexer::ProductIndexer;
use std::sync::Arc;
use tracing::{info, warn};

/// Parsed feed handed off to the indexer, plus the counts the status and
/// HTTP response report.
pub struct FeedLoadOutcome {
    pub products: Vec<Product>,
    pub products_count: usize,
    pub categories_count: usize,
}

pub struct FeedManager {
    store: Arc<DataStore>,
    fetcher: FeedFetcher,
    parser: FeedParser,
}

impl FeedManager {
    pub fn new(store: Arc<DataStore>, cfg: &FeedConfig) -> Result<Self, FeedError> {
        Ok(Self {
            store,
            fetcher: FeedFetcher::new(cfg.download_timeout, cfg.max_bytes)?,
            parser: FeedParser::new(cfg.max_products),
        })
    }

    /// Downloads and parses a project's feed.
    ///
    /// Publishes `downloading` and `indexing` transitions; on failure the
    /// status is set to `error` with the message and the error is returned.
    /// The terminal `success` state is published by [`FeedManager::run`]
    /// once the indexer has consumed the products, or by a caller invoking
    /// [`FeedManager::mark_success`] itself.
    pub async fn load_feed(
        &self,
        project_id: &str,
        url: &str,
    ) -> Result<FeedLoadOutcome, FeedError> {
        info!("FeedManager::load_feed project={} url={}", project_id, url);
        self.publish(project_id, FeedState::Downloading, 20, None)
            .await?;

        let body = match self.fetcher.download(url).await {
            Ok(body) => body,
            Err(err) => {
                self.mark_error(project_id, &err.to_string()).await;
                return Err(err);
            }
        };

        self.publish(project_id, FeedState::Indexing, 60, None).await?;

        let ParsedFeed {
            categories,
            products,
            ..
        } = match self.parser.parse(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                self.mark_error(project_id, &err.to_string()).await;
                return Err(err);
            }
        };

        info!(
            "FeedManager::load_feed project={} products={} categories={}",
            project_id,
            products.len(),
            categories.len()
        );
        Ok(FeedLoadOutcome {
            products_count: products.len(),
            categories_count: categories.len(),
            products,
        })
    }

    /// Full refresh: load the feed, hand the products to the indexer,
    /// persist the product count and publish the terminal status.
    ///
    /// Callers are responsible for holding the per-project feed lock.
    pub async fn run(
        &self,
        project_id: &str,
        url: &str,
        indexer: &ProductIndexer,
    ) -> Result<FeedLoadOutcome, FeedError> {
        let outcome = self.load_feed(project_id, url).await?;

        if let Err(err) = indexer.index_products(project_id, &outcome.products).await {
            self.mark_error(project_id, &err.to_string()).await;
            return Err(err.into());
        }

        if let Err(err) = self
            .store
            .update_products_count(project_id, outcome.products_count as i64)
            .await
        {
            // Relational count is cosmetic next to the live index.
            warn!("FeedManager::run: products_count update failed: {err}");
        }

        self.mark_success(project_id, outcome.products_count, outcome.categories_count)
            .await;
        Ok(outcome)
    }

    /// Delta refresh: a feed carrying only commercial fields is applied as
    /// partial updates, with no reindexing and no status transitions beyond
    /// an error record on failure.
    pub async fn apply_delta(
        &self,
        project_id: &str,
        url: &str,
        indexer: &ProductIndexer,
    ) -> Result<usize, FeedError> {
        let body = self.fetcher.download(url).await?;
        let updates = self.parser.parse_stock_updates(&body)?;
        let updated = indexer.update_stock_prices(project_id, &updates).await?;
        info!(
            "FeedManager::apply_delta project={} updates={} applied={}",
            project_id,
            updates.len(),
            updated
        );
        Ok(updated)
    }

    /// Publishes the terminal `success` status with fresh counts.
    pub async fn mark_success(&self, project_id: &str, products: usize, categories: usize) {
        let status = FeedStatus {
            status: FeedState::Success,
            last_update: Some(Utc::now()),
            products_count: products as u64,
            categories_count: categories as u64,
            message: String::new(),
            progress: 100,
        };
        if let Err(err) = self.store.publish_feed_status(project_id, &status).await {
            warn!("FeedManager::mark_success: status publish failed: {err}");
        }
    }

    /// Records a failed refresh; previously indexed data stays intact.
    pub async fn mark_error(&self, project_id: &str, message: &str) {
        let mut status = self
            .store
            .feed_status(project_id)
            .await
            .unwrap_or_default();
        status.status = FeedState::Error;
        status.message = message.to_string();
        status.last_update = Some(Utc::now());
        if let Err(err) = self.store.publish_feed_status(project_id, &status).await {
            warn!("FeedManager::mark_error: status publish failed: {err}");
        }
    }

    /// Transition publish used on the happy path. A KV failure here aborts
    /// the refresh before anything was mutated.
    async fn publish(
        &self,
        project_id: &str,
        state: FeedState,
        progress: u8,
        message: Option<&str>,
    ) -> Result<(), FeedError> {
        let mut status = self.store.feed_status(project_id).await?;
        status.status = state;
        status.progress = progress;
        status.message = message.unwrap_or_default().to_string();
        self.store.publish_feed_status(project_id, &status).await?;
        Ok(())
    }
}
