//! Scheduled feed refresh.
//!
//! A single long-running task per process: after an initial delay it wakes
//! every check interval, inspects every project and refreshes the stale
//! ones. Refreshes of distinct projects run concurrently up to the worker
//! bound; the per-project lock keeps one refresh per project regardless of
//! who triggered it (this loop or an operator request).

use crate::config::FeedConfig;
use crate::errors::FeedError;
use crate::manager::FeedManager;
use catalog_store::{DataStore, FeedState, FeedStatus, Project};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use product_indexer::ProductIndexer;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Eligibility check for an automatic refresh.
///
/// A feed is due when it has never completed, when its last update is older
/// than the staleness threshold, or when the previous attempt failed (failed
/// refreshes retry on the next cycle rather than waiting out the threshold).
pub fn needs_refresh(status: &FeedStatus, staleness: Duration, now: DateTime<Utc>) -> bool {
    if status.status == FeedState::Error {
        return true;
    }
    match status.last_update {
        None => true,
        Some(last) => {
            let staleness = chrono::Duration::from_std(staleness)
                .unwrap_or_else(|_| chrono::Duration::hours(4));
            now.signed_duration_since(last) >= staleness
        }
    }
}

pub struct FeedScheduler {
    store: Arc<DataStore>,
    manager: Arc<FeedManager>,
    indexer: Arc<ProductIndexer>,
    cfg: FeedConfig,
}

impl FeedScheduler {
    pub fn new(
        store: Arc<DataStore>,
        manager: Arc<FeedManager>,
        indexer: Arc<ProductIndexer>,
        cfg: FeedConfig,
    ) -> Self {
        Self {
            store,
            manager,
            indexer,
            cfg,
        }
    }

    /// Starts the singleton scheduler task. It lives for the rest of the
    /// process; dropping the handle detaches it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(&self) {
        info!(
            "FeedScheduler: starting, interval={:?} staleness={:?} workers={}",
            self.cfg.check_interval, self.cfg.staleness, self.cfg.workers
        );
        sleep(self.cfg.initial_delay).await;
        loop {
            self.run_cycle().await;
            sleep(self.cfg.check_interval).await;
        }
    }

    async fn run_cycle(&self) {
        let projects = match self.store.list_projects().await {
            Ok(projects) => projects,
            Err(err) => {
                warn!("FeedScheduler: project listing failed, skipping cycle: {err}");
                return;
            }
        };

        let candidates: Vec<Project> = projects
            .into_iter()
            .filter(|project| !project.feed_url.trim().is_empty() && project.auto_update)
            .collect();
        debug!("FeedScheduler: cycle start, candidates={}", candidates.len());

        stream::iter(candidates)
            .for_each_concurrent(self.cfg.workers.max(1), |project| async move {
                self.maybe_refresh(&project).await;
            })
            .await;
    }

    async fn maybe_refresh(&self, project: &Project) {
        let status = match self.store.feed_status(&project.id).await {
            Ok(status) => status,
            Err(err) => {
                warn!("FeedScheduler: status read failed for {}: {err}", project.id);
                return;
            }
        };
        if !needs_refresh(&status, self.cfg.staleness, Utc::now()) {
            return;
        }

        match self.store.acquire_feed_lock(&project.id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("FeedScheduler: {} already refreshing, skipping", project.id);
                return;
            }
            Err(err) => {
                warn!("FeedScheduler: lock acquire failed for {}: {err}", project.id);
                return;
            }
        }

        if let Err(err) = self.refresh_with_retries(project).await {
            warn!(
                "FeedScheduler: refresh of {} failed, will retry next cycle: {err}",
                project.id
            );
        }

        if let Err(err) = self.store.release_feed_lock(&project.id).await {
            // The lock TTL bounds the damage of a leaked lock.
            warn!("FeedScheduler: lock release failed for {}: {err}", project.id);
        }
    }

    async fn refresh_with_retries(&self, project: &Project) -> Result<(), FeedError> {
        let mut last_error = None;
        for attempt in 1..=self.cfg.retry_count.max(1) {
            match self
                .manager
                .run(&project.id, &project.feed_url, &self.indexer)
                .await
            {
                Ok(outcome) => {
                    info!(
                        "FeedScheduler: refreshed {} ({} products, attempt {attempt})",
                        project.id, outcome.products_count
                    );
                    return Ok(());
                }
                Err(err) => {
                    warn!(
                        "FeedScheduler: attempt {attempt} for {} failed: {err}",
                        project.id
                    );
                    last_error = Some(err);
                    if attempt < self.cfg.retry_count {
                        sleep(self.cfg.retry_delay).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| FeedError::Parse("no attempts made".to_string())))
    }
}
