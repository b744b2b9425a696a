//! Store access layer
//!
//! All shared state lives in an external key-value store, reached through
//! the [`KvStore`] trait so the production Upstash REST backend and the
//! in-memory test/dev backend are interchangeable.

pub mod keys;
pub mod memory;
pub mod redis;
pub mod schemas;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::types::Result;

pub use memory::MemoryStore;
pub use redis::RedisStore;

/// Access pattern the gateway requires from the shared store.
///
/// Hashes hold the credential indexes and the sparse canvas; one list holds
/// the activity log. Single-key updates are the store's unit of atomicity;
/// nothing here spans keys transactionally.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read one field of a hash.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Write one or more fields of a hash in a single store round trip.
    async fn hset(&self, key: &str, entries: &[(String, String)]) -> Result<()>;

    /// Read a whole hash.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Prepend a value to a list and truncate the list to its most recent
    /// `keep` entries.
    async fn lpush_trim(&self, key: &str, value: &str, keep: usize) -> Result<()>;

    /// Read a closed range of a list, newest first (index 0 is the most
    /// recent prepend).
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>>;
}
