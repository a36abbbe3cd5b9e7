//! High-level store facade bundling the key-value serving copy and the
//! relational source of truth.
//!
//! `DataStore` is the single entry point recommended for application code.
//! It owns the consistency discipline between the two backends: Postgres is
//! authoritative for project metadata, Redis holds derived serving state,
//! and cold API-key lookups fall through KV -> relational and re-populate
//! the cache.

use crate::errors::StoreError;
use crate::keys;
use crate::kv::{KvCommand, KvStore};
use crate::models::{FeedStatus, Project};
use crate::relational::Database;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// TTL of the per-project refresh lock; a crashed refresh unlocks itself.
const FEED_LOCK_TTL_SECS: u64 = 300;

/// Retention of the per-day analytics counters in the KV store.
const DAILY_COUNTER_TTL_SECS: u64 = 86_400 * 30;

pub struct DataStore {
    kv: Arc<dyn KvStore>,
    db: Database,
}

impl DataStore {
    pub fn new(kv: Arc<dyn KvStore>, db: Database) -> Self {
        Self { kv, db }
    }

    /// Shared handle to the key-value side, for the indexer and engines.
    pub fn kv(&self) -> Arc<dyn KvStore> {
        Arc::clone(&self.kv)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    // ---- Projects and API keys ------------------------------------------

    pub async fn get_project(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        self.db.get_project(project_id).await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        self.db.list_projects().await
    }

    /// Resolves an API key to a project id.
    ///
    /// The KV cache answers hot lookups; on a miss the relational store is
    /// consulted and the binding is written back, so a warm cache keeps the
    /// search path alive through relational outages.
    pub async fn resolve_api_key(&self, api_key: &str) -> Result<Option<String>, StoreError> {
        if let Some(project_id) = self.kv.get(&keys::api_key(api_key)).await? {
            return Ok(Some(project_id));
        }
        match self.db.get_project_by_api_key(api_key).await? {
            Some(project) => {
                if let Err(err) = self.kv.set(&keys::api_key(api_key), &project.id).await {
                    warn!("DataStore::resolve_api_key: cache write failed: {err}");
                }
                Ok(Some(project.id))
            }
            None => Ok(None),
        }
    }

    pub async fn update_products_count(
        &self,
        project_id: &str,
        count: i64,
    ) -> Result<(), StoreError> {
        self.db.update_products_count(project_id, count).await
    }

    /// Deletes a project and cascades into every piece of derived state.
    pub async fn delete_project(&self, project_id: &str) -> Result<bool, StoreError> {
        let project = self.db.get_project(project_id).await?;
        let deleted = self.db.delete_project(project_id).await?;
        if !deleted {
            return Ok(false);
        }

        let mut stale = Vec::new();
        for pattern in [
            keys::product_pattern(project_id),
            keys::index_pattern(project_id),
            format!("analytics:{project_id}:*"),
        ] {
            stale.extend(self.kv.keys(&pattern).await?);
        }
        stale.push(keys::feed(project_id));
        stale.push(keys::synonyms(project_id));
        if let Some(project) = project {
            if !project.api_key.is_empty() {
                stale.push(keys::api_key(&project.api_key));
            }
        }
        self.kv.delete(&stale).await?;
        debug!(
            "DataStore::delete_project project={} derived_keys={}",
            project_id,
            stale.len()
        );
        Ok(true)
    }

    // ---- Feed status and synonyms ---------------------------------------

    /// Reads the last refresh outcome; an absent hash reads as `not_loaded`.
    pub async fn feed_status(&self, project_id: &str) -> Result<FeedStatus, StoreError> {
        let fields = self.kv.hgetall(&keys::feed(project_id)).await?;
        Ok(FeedStatus::from_fields(&fields))
    }

    pub async fn publish_feed_status(
        &self,
        project_id: &str,
        status: &FeedStatus,
    ) -> Result<(), StoreError> {
        self.kv
            .hset_map(&keys::feed(project_id), &status.to_fields())
            .await
    }

    /// Synonym groups from the KV cache; missing or malformed data reads as
    /// no groups.
    pub async fn synonyms(&self, project_id: &str) -> Result<Vec<Vec<String>>, StoreError> {
        match self.kv.get(&keys::synonyms(project_id)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    /// Write-through synonym update: relational first, then the cache.
    pub async fn set_synonyms(
        &self,
        project_id: &str,
        groups: &[Vec<String>],
    ) -> Result<(), StoreError> {
        self.db.update_synonyms(project_id, groups).await?;
        self.kv
            .set(&keys::synonyms(project_id), &serde_json::to_string(groups)?)
            .await
    }

    // ---- Refresh lock ---------------------------------------------------

    /// Claims the per-project refresh lock. `false` means another refresh
    /// is in flight and the caller must skip silently.
    pub async fn acquire_feed_lock(&self, project_id: &str) -> Result<bool, StoreError> {
        self.kv
            .set_nx_ex(&keys::feed_lock(project_id), "processing", FEED_LOCK_TTL_SECS)
            .await
    }

    pub async fn release_feed_lock(&self, project_id: &str) -> Result<(), StoreError> {
        self.kv.delete(&[keys::feed_lock(project_id)]).await
    }

    // ---- Analytics ------------------------------------------------------

    /// Records one search. Counters are never part of retrieval and must
    /// never fail it, so failures are logged and swallowed here.
    pub async fn log_search(&self, project_id: &str, query: &str) {
        let day = Utc::now().format("%Y-%m-%d").to_string();
        let commands = vec![
            KvCommand::Incr {
                key: keys::daily_queries(project_id, &day),
            },
            KvCommand::Expire {
                key: keys::daily_queries(project_id, &day),
                ttl_secs: DAILY_COUNTER_TTL_SECS,
            },
            KvCommand::Incr {
                key: keys::total_queries(project_id),
            },
            KvCommand::ZIncrBy {
                key: keys::popular_queries(project_id),
                member: query.to_lowercase(),
                delta: 1.0,
            },
        ];
        if let Err(err) = self.kv.pipeline_execute(commands).await {
            warn!("DataStore::log_search: kv counters failed: {err}");
        }

        let date = Utc::now().date_naive();
        if let Err(err) = self.db.increment_daily_queries(project_id, date).await {
            warn!("DataStore::log_search: daily backup failed: {err}");
        }
        if let Err(err) = self.db.increment_totals(project_id, 1, 0).await {
            warn!("DataStore::log_search: totals backup failed: {err}");
        }
        if let Err(err) = self
            .db
            .increment_popular_query(project_id, &query.to_lowercase())
            .await
        {
            warn!("DataStore::log_search: popular backup failed: {err}");
        }
    }

    /// Records one product click plus the query that led to it.
    pub async fn log_click(&self, project_id: &str, product_id: &str, query: &str) {
        let day = Utc::now().format("%Y-%m-%d").to_string();
        let commands = vec![
            KvCommand::Incr {
                key: keys::daily_clicks(project_id, &day),
            },
            KvCommand::Expire {
                key: keys::daily_clicks(project_id, &day),
                ttl_secs: DAILY_COUNTER_TTL_SECS,
            },
            KvCommand::Incr {
                key: keys::total_clicks(project_id),
            },
            KvCommand::ZIncrBy {
                key: keys::popular_products(project_id),
                member: product_id.to_string(),
                delta: 1.0,
            },
            KvCommand::ZIncrBy {
                key: keys::converting_queries(project_id),
                member: query.to_lowercase(),
                delta: 1.0,
            },
        ];
        if let Err(err) = self.kv.pipeline_execute(commands).await {
            warn!("DataStore::log_click: kv counters failed: {err}");
        }

        let date = Utc::now().date_naive();
        if let Err(err) = self.db.increment_daily_clicks(project_id, date).await {
            warn!("DataStore::log_click: daily backup failed: {err}");
        }
        if let Err(err) = self.db.increment_totals(project_id, 0, 1).await {
            warn!("DataStore::log_click: totals backup failed: {err}");
        }
        if let Err(err) = self
            .db
            .increment_popular_product(project_id, product_id)
            .await
        {
            warn!("DataStore::log_click: product backup failed: {err}");
        }
        if let Err(err) = self
            .db
            .increment_converting_query(project_id, &query.to_lowercase())
            .await
        {
            warn!("DataStore::log_click: converting backup failed: {err}");
        }
    }
}
