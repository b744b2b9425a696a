//! In-memory cache for membership verdicts
//!
//! Oracle queries are slow and can fail; verdicts are cached per principal
//! for a short TTL so a paint burst does not hammer the chain RPC. Entries
//! are best-effort: staleness up to the TTL is accepted, and there is no
//! invalidation on balance changes other than expiry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Configuration for the membership cache
#[derive(Debug, Clone)]
pub struct MembershipCacheConfig {
    /// How long a verdict is served before the oracle is asked again
    pub ttl: Duration,

    /// Maximum number of cached principals (prevents memory exhaustion)
    pub max_entries: usize,
}

impl Default for MembershipCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 10_000,
        }
    }
}

/// A cached verdict with its expiry
struct CachedVerdict {
    has_min_balance: bool,
    expires_at: Instant,
}

impl CachedVerdict {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Counters for observing cache behavior
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

/// TTL cache of membership verdicts keyed by lowercased principal
pub struct MembershipCache {
    cache: DashMap<String, CachedVerdict>,
    config: MembershipCacheConfig,
    stats: CacheStats,
}

impl MembershipCache {
    pub fn new(config: MembershipCacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(MembershipCacheConfig::default())
    }

    /// Get a verdict if present and not expired.
    pub fn get(&self, principal: &str) -> Option<bool> {
        let key = principal.to_lowercase();
        if let Some(entry) = self.cache.get(&key) {
            if entry.is_expired() {
                drop(entry);
                self.cache.remove(&key);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Some(entry.has_min_balance);
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a definitive verdict for the configured TTL.
    pub fn insert(&self, principal: &str, has_min_balance: bool) {
        if self.cache.len() >= self.config.max_entries {
            self.evict_oldest();
        }

        self.cache.insert(
            principal.to_lowercase(),
            CachedVerdict {
                has_min_balance,
                expires_at: Instant::now() + self.config.ttl,
            },
        );
        self.stats.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove all expired entries; returns how many were dropped.
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        self.cache.retain(|_, v| {
            if v.is_expired() {
                removed += 1;
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            inserts: self.stats.inserts.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
        }
    }

    /// Evict the entry closest to expiry.
    fn evict_oldest(&self) {
        let oldest_key = self
            .cache
            .iter()
            .min_by_key(|e| e.expires_at)
            .map(|e| e.key().clone());

        if let Some(key) = oldest_key {
            self.cache.remove(&key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Default for MembershipCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}
