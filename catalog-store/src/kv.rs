//! Key-value capability interface.
//!
//! The indexer and both query engines depend on this trait only; the concrete
//! client (Redis in production, the in-memory store in tests) is chosen at
//! wiring time. Bulk writes go through [`KvStore::pipeline_execute`], which
//! applies a command batch in one round-trip per chunk.

use crate::errors::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;

/// One buffered write inside a pipelined batch.
#[derive(Debug, Clone)]
pub enum KvCommand {
    Set {
        key: String,
        value: String,
    },
    Delete {
        keys: Vec<String>,
    },
    ZAdd {
        key: String,
        member: String,
        score: f64,
    },
    SAdd {
        key: String,
        members: Vec<String>,
    },
    HSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    Incr {
        key: String,
    },
    ZIncrBy {
        key: String,
        member: String,
        delta: f64,
    },
    Expire {
        key: String,
        ttl_secs: u64,
    },
}

/// Minimal key-value capability the service needs.
///
/// Score-ordered sets use double-precision scores. `keys` accepts the
/// `prefix*` glob patterns from [`crate::keys`] only.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Set-if-absent with expiry; returns `true` when the key was claimed.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool, StoreError>;

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError>;

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    async fn sadd(&self, key: &str, members: &[String]) -> Result<(), StoreError>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError>;

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError>;

    /// Full zset content, highest score first.
    async fn zrevrange_withscores(&self, key: &str) -> Result<Vec<(String, f64)>, StoreError>;

    async fn zincrby(&self, key: &str, member: &str, delta: f64) -> Result<f64, StoreError>;

    async fn hset_map(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError>;

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// Applies the batch in order. Not atomic against concurrent readers;
    /// the search path tolerates the replacement window by dropping
    /// hydrate misses.
    async fn pipeline_execute(&self, commands: Vec<KvCommand>) -> Result<(), StoreError>;
}
