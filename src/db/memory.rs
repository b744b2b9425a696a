//! In-memory store backend
//!
//! Used in dev mode when no Upstash endpoint is configured, and as the test
//! double. Mirrors the hash/list semantics the gateway relies on.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::KvStore;
use crate::types::Result;

/// Process-local store with the same shape as the Redis backend
#[derive(Default)]
pub struct MemoryStore {
    hashes: RwLock<HashMap<String, HashMap<String, String>>>,
    lists: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of a list, for test assertions.
    pub async fn list_len(&self, key: &str) -> usize {
        self.lists
            .read()
            .await
            .get(key)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self
            .hashes
            .read()
            .await
            .get(key)
            .and_then(|h| h.get(field))
            .cloned())
    }

    async fn hset(&self, key: &str, entries: &[(String, String)]) -> Result<()> {
        let mut hashes = self.hashes.write().await;
        let hash = hashes.entry(key.to_string()).or_default();
        for (field, value) in entries {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self
            .hashes
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn lpush_trim(&self, key: &str, value: &str, keep: usize) -> Result<()> {
        let mut lists = self.lists.write().await;
        let list = lists.entry(key.to_string()).or_default();
        list.insert(0, value.to_string());
        list.truncate(keep);
        Ok(())
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let lists = self.lists.read().await;
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        if start < 0 || stop < start {
            return Ok(Vec::new());
        }
        let start = start as usize;
        let stop = (stop as usize).min(list.len().saturating_sub(1));
        if start >= list.len() {
            return Ok(Vec::new());
        }
        Ok(list[start..=stop].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_roundtrip() {
        let store = MemoryStore::new();
        store
            .hset("h", &[("a".into(), "1".into()), ("b".into(), "2".into())])
            .await
            .unwrap();

        assert_eq!(store.hget("h", "a").await.unwrap(), Some("1".to_string()));
        assert_eq!(store.hget("h", "missing").await.unwrap(), None);
        assert_eq!(store.hgetall("h").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_prepends_and_trims() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.lpush_trim("l", &i.to_string(), 3).await.unwrap();
        }

        assert_eq!(store.list_len("l").await, 3);
        let range = store.lrange("l", 0, 1).await.unwrap();
        assert_eq!(range, vec!["4".to_string(), "3".to_string()]);
    }

    #[tokio::test]
    async fn lrange_clamps_out_of_range() {
        let store = MemoryStore::new();
        store.lpush_trim("l", "only", 10).await.unwrap();

        assert_eq!(store.lrange("l", 0, 49).await.unwrap().len(), 1);
        assert!(store.lrange("l", 5, 9).await.unwrap().is_empty());
        assert!(store.lrange("missing", 0, 49).await.unwrap().is_empty());
    }
}
