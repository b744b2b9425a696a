//! Membership gating
//!
//! Access to the canvas can be gated on holding a minimum balance of the
//! $GRAFFITI token. The gate checks its cache first and falls back to the
//! balance oracle on a miss. An oracle that cannot answer produces a denial
//! (fail-closed) so a flaky RPC degrades to 403s instead of 500s; the
//! unknown verdict is not cached, so a recovered oracle is honored on the
//! next request.

pub mod cache;
pub mod oracle;

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub use cache::{CacheStatsSnapshot, MembershipCache, MembershipCacheConfig};
pub use oracle::{BalanceOracle, Erc20Oracle, OracleError};

/// Returned with every denial so callers know how to get in
pub const MEMBERSHIP_GUIDANCE: &str =
    "wallet does not hold the minimum $GRAFFITI balance. Get some at https://mint.club/token/base/GRAFFITI";

/// Policy layer over the cache and the oracle
pub struct MembershipGate {
    /// None means gating is disabled and everyone is admitted
    oracle: Option<Arc<dyn BalanceOracle>>,
    cache: MembershipCache,
}

impl MembershipGate {
    /// Gate that admits everyone (no token configured).
    pub fn disabled() -> Self {
        Self {
            oracle: None,
            cache: MembershipCache::with_defaults(),
        }
    }

    /// Gate backed by a balance oracle with the given cache TTL.
    pub fn new(oracle: Arc<dyn BalanceOracle>, ttl: Duration) -> Self {
        Self {
            oracle: Some(oracle),
            cache: MembershipCache::new(MembershipCacheConfig {
                ttl,
                ..Default::default()
            }),
        }
    }

    /// Whether gating is configured at all.
    pub fn enabled(&self) -> bool {
        self.oracle.is_some()
    }

    /// Whether `principal` is currently a member.
    ///
    /// Concurrent misses for the same principal may each query the oracle;
    /// the stampede is accepted rather than locked around.
    pub async fn is_member(&self, principal: &str) -> bool {
        let Some(ref oracle) = self.oracle else {
            return true;
        };

        if let Some(verdict) = self.cache.get(principal) {
            return verdict;
        }

        match oracle.has_min_balance(principal).await {
            Ok(verdict) => {
                self.cache.insert(principal, verdict);
                verdict
            }
            Err(e) => {
                // Unknown collapses to not-a-member here, at the policy
                // boundary, and is deliberately not cached.
                warn!("Membership oracle unavailable, denying {}: {}", principal, e);
                false
            }
        }
    }

    /// Cache counters, for logging and tests.
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }
}
