//! In-process realization of [`KvStore`].
//!
//! Mirrors the small slice of Redis semantics the service relies on so the
//! indexing and retrieval flows can be exercised hermetically in tests.
//! TTLs are accepted but not enforced; nothing in the test suite sleeps
//! past an expiry.

use crate::errors::StoreError;
use crate::kv::{KvCommand, KvStore};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Entry {
    Str(String),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
    ZSet(HashMap<String, f64>),
}

/// Hermetic key-value store backed by a mutexed map.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(pattern: &str, key: &str) -> bool {
        match pattern.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => key == pattern,
        }
    }

    fn apply(entries: &mut HashMap<String, Entry>, command: KvCommand) {
        match command {
            KvCommand::Set { key, value } => {
                entries.insert(key, Entry::Str(value));
            }
            KvCommand::Delete { keys } => {
                for key in keys {
                    entries.remove(&key);
                }
            }
            KvCommand::ZAdd { key, member, score } => {
                let entry = entries
                    .entry(key)
                    .or_insert_with(|| Entry::ZSet(HashMap::new()));
                if let Entry::ZSet(zset) = entry {
                    zset.insert(member, score);
                }
            }
            KvCommand::SAdd { key, members } => {
                let entry = entries
                    .entry(key)
                    .or_insert_with(|| Entry::Set(BTreeSet::new()));
                if let Entry::Set(set) = entry {
                    set.extend(members);
                }
            }
            KvCommand::HSet { key, fields } => {
                let entry = entries
                    .entry(key)
                    .or_insert_with(|| Entry::Hash(HashMap::new()));
                if let Entry::Hash(hash) = entry {
                    hash.extend(fields);
                }
            }
            KvCommand::Incr { key } => {
                let entry = entries
                    .entry(key)
                    .or_insert_with(|| Entry::Str("0".to_string()));
                if let Entry::Str(value) = entry {
                    let current: i64 = value.parse().unwrap_or(0);
                    *value = (current + 1).to_string();
                }
            }
            KvCommand::ZIncrBy { key, member, delta } => {
                let entry = entries
                    .entry(key)
                    .or_insert_with(|| Entry::ZSet(HashMap::new()));
                if let Entry::ZSet(zset) = entry {
                    *zset.entry(member).or_insert(0.0) += delta;
                }
            }
            KvCommand::Expire { .. } => {}
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.inner.lock().expect("memory store poisoned");
        Ok(match entries.get(key) {
            Some(Entry::Str(value)) => Some(value.clone()),
            _ => None,
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.inner.lock().expect("memory store poisoned");
        entries.insert(key.to_string(), Entry::Str(value.to_string()));
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, _ttl_secs: u64) -> Result<bool, StoreError> {
        let mut entries = self.inner.lock().expect("memory store poisoned");
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), Entry::Str(value.to_string()));
        Ok(true)
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut entries = self.inner.lock().expect("memory store poisoned");
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.inner.lock().expect("memory store poisoned");
        let mut matched: Vec<String> = entries
            .keys()
            .filter(|key| Self::matches(pattern, key))
            .cloned()
            .collect();
        matched.sort();
        Ok(matched)
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<(), StoreError> {
        let mut entries = self.inner.lock().expect("memory store poisoned");
        Self::apply(
            &mut entries,
            KvCommand::SAdd {
                key: key.to_string(),
                members: members.to_vec(),
            },
        );
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.inner.lock().expect("memory store poisoned");
        Ok(match entries.get(key) {
            Some(Entry::Set(set)) => set.iter().cloned().collect(),
            _ => Vec::new(),
        })
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut entries = self.inner.lock().expect("memory store poisoned");
        Self::apply(
            &mut entries,
            KvCommand::ZAdd {
                key: key.to_string(),
                member: member.to_string(),
                score,
            },
        );
        Ok(())
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        let entries = self.inner.lock().expect("memory store poisoned");
        Ok(match entries.get(key) {
            Some(Entry::ZSet(zset)) => zset.get(member).copied(),
            _ => None,
        })
    }

    async fn zrevrange_withscores(&self, key: &str) -> Result<Vec<(String, f64)>, StoreError> {
        let entries = self.inner.lock().expect("memory store poisoned");
        let mut ranked: Vec<(String, f64)> = match entries.get(key) {
            Some(Entry::ZSet(zset)) => zset.iter().map(|(m, s)| (m.clone(), *s)).collect(),
            _ => Vec::new(),
        };
        // Score descending, ties by member descending, matching ZREVRANGE.
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.cmp(&a.0))
        });
        Ok(ranked)
    }

    async fn zincrby(&self, key: &str, member: &str, delta: f64) -> Result<f64, StoreError> {
        let mut entries = self.inner.lock().expect("memory store poisoned");
        Self::apply(
            &mut entries,
            KvCommand::ZIncrBy {
                key: key.to_string(),
                member: member.to_string(),
                delta,
            },
        );
        Ok(match entries.get(key) {
            Some(Entry::ZSet(zset)) => zset.get(member).copied().unwrap_or(0.0),
            _ => 0.0,
        })
    }

    async fn hset_map(&self, key: &str, fields: &[(String, String)]) -> Result<(), StoreError> {
        let mut entries = self.inner.lock().expect("memory store poisoned");
        Self::apply(
            &mut entries,
            KvCommand::HSet {
                key: key.to_string(),
                fields: fields.to_vec(),
            },
        );
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let entries = self.inner.lock().expect("memory store poisoned");
        Ok(match entries.get(key) {
            Some(Entry::Hash(hash)) => hash.clone(),
            _ => HashMap::new(),
        })
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut entries = self.inner.lock().expect("memory store poisoned");
        Self::apply(&mut entries, KvCommand::Incr { key: key.to_string() });
        Ok(match entries.get(key) {
            Some(Entry::Str(value)) => value.parse().unwrap_or(0),
            _ => 0,
        })
    }

    async fn expire(&self, _key: &str, _ttl_secs: u64) -> Result<(), StoreError> {
        Ok(())
    }

    async fn pipeline_execute(&self, commands: Vec<KvCommand>) -> Result<(), StoreError> {
        let mut entries = self.inner.lock().expect("memory store poisoned");
        for command in commands {
            Self::apply(&mut entries, command);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_nx_claims_only_once() {
        let store = MemoryStore::new();
        assert!(store.set_nx_ex("lock:feed:p", "1", 300).await.unwrap());
        assert!(!store.set_nx_ex("lock:feed:p", "1", 300).await.unwrap());
        store.delete(&["lock:feed:p".to_string()]).await.unwrap();
        assert!(store.set_nx_ex("lock:feed:p", "1", 300).await.unwrap());
    }

    #[tokio::test]
    async fn zrevrange_orders_by_score_desc() {
        let store = MemoryStore::new();
        store.zadd("z", "low", 1.0).await.unwrap();
        store.zadd("z", "high", 5.0).await.unwrap();
        store.zadd("z", "mid", 3.0).await.unwrap();
        let ranked = store.zrevrange_withscores("z").await.unwrap();
        let members: Vec<&str> = ranked.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(members, vec!["high", "mid", "low"]);
    }

    #[tokio::test]
    async fn pipeline_applies_deletes_before_writes_in_order() {
        let store = MemoryStore::new();
        store.set("products:p:1", "old").await.unwrap();
        store
            .pipeline_execute(vec![
                KvCommand::Delete {
                    keys: vec!["products:p:1".to_string()],
                },
                KvCommand::Set {
                    key: "products:p:2".to_string(),
                    value: "new".to_string(),
                },
            ])
            .await
            .unwrap();
        assert_eq!(store.get("products:p:1").await.unwrap(), None);
        assert_eq!(store.get("products:p:2").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn keys_supports_prefix_globs() {
        let store = MemoryStore::new();
        store.set("idx:p:inv:a", "1").await.unwrap();
        store.set("idx:p:inv:b", "1").await.unwrap();
        store.set("idx:q:inv:a", "1").await.unwrap();
        let keys = store.keys("idx:p:*").await.unwrap();
        assert_eq!(keys.len(), 2);
    }
}
