//! Redis realization of [`KvStore`] over a connection manager.

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::kv::{KvCommand, KvStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use tracing::{debug, info};

/// Production key-value client. The connection manager reconnects on broken
/// links, so a clone per call is cheap and the store is freely shareable.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects using the configured URL.
    ///
    /// # Errors
    /// Returns `StoreError::Kv` when the server is unreachable.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self, StoreError> {
        info!("RedisStore::connect host={} port={}", cfg.redis_host, cfg.redis_port);
        let client = redis::Client::open(cfg.redis_url())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        // SCAN instead of KEYS: index wipes run against live serving traffic.
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut out = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(500)
                .query_async(&mut conn)
                .await?;
            out.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        debug!("RedisStore::keys pattern={} matched={}", pattern, out.len());
        Ok(out)
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<(), StoreError> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SADD")
            .arg(key)
            .arg(members)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = redis::cmd("SMEMBERS").arg(key).query_async(&mut conn).await?;
        Ok(members)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("ZADD")
            .arg(key)
            .arg(score)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        let mut conn = self.conn.clone();
        let score: Option<f64> = redis::cmd("ZSCORE")
            .arg(key)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(score)
    }

    async fn zrevrange_withscores(&self, key: &str) -> Result<Vec<(String, f64)>, StoreError> {
        let mut conn = self.conn.clone();
        let entries: Vec<(String, f64)> = redis::cmd("ZREVRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .arg("WITHSCORES")
            .query_async(&mut conn)
            .await?;
        Ok(entries)
    }

    async fn zincrby(&self, key: &str, member: &str, delta: f64) -> Result<f64, StoreError> {
        let mut conn = self.conn.clone();
        let score: f64 = redis::cmd("ZINCRBY")
            .arg(key)
            .arg(delta)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(score)
    }

    async fn hset_map(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(field).arg(value);
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.conn.clone();
        let map: HashMap<String, String> =
            redis::cmd("HGETALL").arg(key).query_async(&mut conn).await?;
        Ok(map)
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let value: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn pipeline_execute(&self, commands: Vec<KvCommand>) -> Result<(), StoreError> {
        if commands.is_empty() {
            return Ok(());
        }
        debug!("RedisStore::pipeline_execute commands={}", commands.len());
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for command in &commands {
            match command {
                KvCommand::Set { key, value } => {
                    pipe.cmd("SET").arg(key).arg(value).ignore();
                }
                KvCommand::Delete { keys } => {
                    if !keys.is_empty() {
                        pipe.cmd("DEL").arg(keys).ignore();
                    }
                }
                KvCommand::ZAdd { key, member, score } => {
                    pipe.cmd("ZADD").arg(key).arg(*score).arg(member).ignore();
                }
                KvCommand::SAdd { key, members } => {
                    if !members.is_empty() {
                        pipe.cmd("SADD").arg(key).arg(members).ignore();
                    }
                }
                KvCommand::HSet { key, fields } => {
                    if !fields.is_empty() {
                        let mut cmd = redis::cmd("HSET");
                        cmd.arg(key);
                        for (field, value) in fields {
                            cmd.arg(field).arg(value);
                        }
                        pipe.add_command(cmd).ignore();
                    }
                }
                KvCommand::Incr { key } => {
                    pipe.cmd("INCR").arg(key).ignore();
                }
                KvCommand::ZIncrBy { key, member, delta } => {
                    pipe.cmd("ZINCRBY").arg(key).arg(*delta).arg(member).ignore();
                }
                KvCommand::Expire { key, ttl_secs } => {
                    pipe.cmd("EXPIRE").arg(key).arg(*ttl_secs).ignore();
                }
            }
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}
