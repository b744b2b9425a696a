//! Write coordination
//!
//! The core of the gateway: registration, the paint pipeline, and the reads
//! derived from paint writes (canvas snapshot, leaderboard, activity log).
//! The coordinator is stateless per request; everything shared lives behind
//! the injected store.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{self, AgentRegistry};
use crate::canvas;
use crate::db::schemas::Agent;
use crate::db::{keys, KvStore};
use crate::gate::{MembershipGate, MEMBERSHIP_GUIDANCE};
use crate::types::{GraffitiError, Result};

/// Entries retained in the activity log
pub const LOG_CAPACITY: usize = 1000;

/// Entries returned by a log read
pub const LOG_READ_LIMIT: usize = 50;

/// One paint batch as recorded in the activity log
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ActivityEntry {
    pub agent: String,
    pub color: String,
    pub pixels: Vec<[u32; 2]>,
    pub time: String,
}

/// Outcome of a successful paint
#[derive(Debug)]
pub struct PaintReceipt {
    pub painted: usize,
    pub color: [u8; 3],
    pub agent: String,
    pub total_painted: u64,
}

/// Leaderboard row
#[derive(Serialize, Debug, Clone)]
pub struct AgentSummary {
    pub name: String,
    pub pixels_painted: u64,
    pub created_at: String,
}

/// Coordinates every write and read against the shared store
pub struct Coordinator {
    store: Arc<dyn KvStore>,
    registry: AgentRegistry,
    gate: Arc<MembershipGate>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn KvStore>, gate: Arc<MembershipGate>) -> Self {
        Self {
            registry: AgentRegistry::new(Arc::clone(&store)),
            store,
            gate,
        }
    }

    /// Register a new agent and issue its credential.
    ///
    /// Validation order is fixed; each step is a distinct failure. The
    /// credential/index writes are separate store round trips (accepted
    /// partial-failure window, no compensating transaction).
    pub async fn register(&self, name: Option<&str>, wallet: Option<&str>) -> Result<Agent> {
        let name = name.unwrap_or("").trim();
        if name.chars().count() < 2 {
            return Err(GraffitiError::InvalidInput(
                "name is required (min 2 chars)".to_string(),
            ));
        }
        let clean_name: String = name.chars().take(32).collect();

        // Wallets only matter on gated deployments; ungated ones ignore them
        let wallet = if self.gate.enabled() {
            let wallet = wallet.map(str::trim).filter(|w| !w.is_empty()).ok_or_else(|| {
                GraffitiError::InvalidInput(
                    "wallet_address is required to register".to_string(),
                )
            })?;
            if !crate::gate::oracle::is_valid_address(wallet) {
                return Err(GraffitiError::InvalidInput(
                    "wallet_address must be a valid 0x-prefixed address".to_string(),
                ));
            }
            if !self.gate.is_member(wallet).await {
                return Err(GraffitiError::AccessDenied(MEMBERSHIP_GUIDANCE.to_string()));
            }
            Some(wallet.to_string())
        } else {
            None
        };

        if self.registry.name_taken(&clean_name).await? {
            return Err(GraffitiError::Conflict("name already taken".to_string()));
        }
        if let Some(ref wallet) = wallet {
            if self.registry.wallet_taken(wallet).await? {
                return Err(GraffitiError::Conflict(
                    "wallet already registered".to_string(),
                ));
            }
        }

        let agent = Agent::new(clean_name, auth::generate_api_key(), wallet);
        self.registry.insert(&agent).await?;

        info!("Registered agent '{}'", agent.name);
        Ok(agent)
    }

    /// Apply one paint batch.
    ///
    /// The canvas update, the counter increment, and the log append are
    /// three independent store writes; a crash between them can leave them
    /// inconsistent, which is the documented best-effort model.
    pub async fn paint(&self, api_key: &str, color: &Value, pixels: &Value) -> Result<PaintReceipt> {
        let Some(mut agent) = self.registry.resolve(api_key).await? else {
            return Err(GraffitiError::Unauthorized("invalid API key".to_string()));
        };

        if let Some(wallet) = agent.wallet_address.clone() {
            if !self.gate.is_member(&wallet).await {
                return Err(GraffitiError::AccessDenied(MEMBERSHIP_GUIDANCE.to_string()));
            }
        }

        let color = canvas::parse_color(color)?;
        let coords = canvas::parse_batch(pixels)?;
        let color_hex = color.to_hex();

        let entries: Vec<(String, String)> = coords
            .iter()
            .map(|c| (c.wire_key(), color_hex.clone()))
            .collect();
        self.store.hset(keys::CANVAS, &entries).await?;

        agent.pixels_painted += coords.len() as u64;
        self.registry.persist(&agent).await?;

        let entry = ActivityEntry {
            agent: agent.name.clone(),
            color: color_hex,
            pixels: coords.iter().map(|c| c.pair()).collect(),
            time: Utc::now().to_rfc3339(),
        };
        let raw = serde_json::to_string(&entry)
            .map_err(|e| GraffitiError::Internal(format!("log encode failed: {}", e)))?;
        self.store.lpush_trim(keys::LOG, &raw, LOG_CAPACITY).await?;

        info!("Agent '{}' painted {} pixel(s)", agent.name, coords.len());
        Ok(PaintReceipt {
            painted: coords.len(),
            color: color.components(),
            agent: agent.name,
            total_painted: agent.pixels_painted,
        })
    }

    /// Full sparse canvas: wire key -> hex color.
    pub async fn canvas(&self) -> Result<HashMap<String, String>> {
        self.store.hgetall(keys::CANVAS).await
    }

    /// All agents, sorted for the leaderboard: pixels painted descending,
    /// then registration time ascending, then name.
    pub async fn agents(&self) -> Result<Vec<AgentSummary>> {
        let mut agents: Vec<AgentSummary> = self
            .registry
            .list()
            .await?
            .into_iter()
            .map(|a| AgentSummary {
                name: a.name,
                pixels_painted: a.pixels_painted,
                created_at: a.created_at,
            })
            .collect();

        agents.sort_by(|a, b| {
            b.pixels_painted
                .cmp(&a.pixels_painted)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(agents)
    }

    /// Most recent log entries, newest first, capped at [`LOG_READ_LIMIT`].
    pub async fn log(&self) -> Result<Vec<ActivityEntry>> {
        let raw = self
            .store
            .lrange(keys::LOG, 0, LOG_READ_LIMIT as i64 - 1)
            .await?;

        let mut entries = Vec::with_capacity(raw.len());
        for item in raw {
            match serde_json::from_str::<ActivityEntry>(&item) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping corrupt log entry: {}", e),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::gate::{BalanceOracle, OracleError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct FixedOracle(std::result::Result<bool, ()>);

    #[async_trait]
    impl BalanceOracle for FixedOracle {
        async fn has_min_balance(&self, _address: &str) -> std::result::Result<bool, OracleError> {
            self.0
                .map_err(|_| OracleError::Transport("down".to_string()))
        }
    }

    const WALLET: &str = "0x299c30DD5974BF4D5bFE42C340CA40462816AB07";

    fn open_coordinator() -> (Coordinator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let coordinator = Coordinator::new(
            Arc::clone(&store) as Arc<dyn KvStore>,
            Arc::new(MembershipGate::disabled()),
        );
        (coordinator, store)
    }

    fn gated_coordinator(oracle: FixedOracle) -> (Coordinator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let gate = MembershipGate::new(Arc::new(oracle), Duration::from_secs(300));
        let coordinator = Coordinator::new(Arc::clone(&store) as Arc<dyn KvStore>, Arc::new(gate));
        (coordinator, store)
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn register_rejects_short_names() {
        let (coordinator, _) = open_coordinator();
        for bad in [None, Some(""), Some(" "), Some("x"), Some("  y  ")] {
            let err = coordinator.register(bad, None).await.unwrap_err();
            assert_eq!(err.to_string(), "name is required (min 2 chars)");
        }
    }

    #[tokio::test]
    async fn register_trims_and_truncates_names() {
        let (coordinator, _) = open_coordinator();
        let long = "x".repeat(40);
        let agent = coordinator
            .register(Some(&format!("  {}  ", long)), None)
            .await
            .unwrap();
        assert_eq!(agent.name.chars().count(), 32);
        assert!(agent.api_key.starts_with("grf_"));
    }

    #[tokio::test]
    async fn register_conflicts_on_case_insensitive_names() {
        let (coordinator, _) = open_coordinator();
        coordinator.register(Some("Banksy"), None).await.unwrap();

        let err = coordinator.register(Some("bAnKsY"), None).await.unwrap_err();
        assert_eq!(err.to_string(), "name already taken");
    }

    #[tokio::test]
    async fn gated_register_requires_valid_wallet() {
        let (coordinator, _) = gated_coordinator(FixedOracle(Ok(true)));

        let missing = coordinator.register(Some("tag"), None).await.unwrap_err();
        assert!(missing.to_string().contains("wallet_address is required"));

        let bad = coordinator
            .register(Some("tag"), Some("nope"))
            .await
            .unwrap_err();
        assert!(bad.to_string().contains("valid 0x-prefixed address"));
    }

    #[tokio::test]
    async fn gated_register_denies_non_members() {
        let (coordinator, _) = gated_coordinator(FixedOracle(Ok(false)));
        let err = coordinator
            .register(Some("tag"), Some(WALLET))
            .await
            .unwrap_err();
        assert!(matches!(err, GraffitiError::AccessDenied(_)));
        assert!(err.to_string().contains("GRAFFITI"));
    }

    #[tokio::test]
    async fn gated_register_conflicts_on_reused_wallet() {
        let (coordinator, _) = gated_coordinator(FixedOracle(Ok(true)));
        coordinator
            .register(Some("first"), Some(WALLET))
            .await
            .unwrap();

        let err = coordinator
            .register(Some("second"), Some(&WALLET.to_lowercase()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "wallet already registered");
    }

    #[tokio::test]
    async fn ungated_register_ignores_wallets() {
        let (coordinator, _) = open_coordinator();
        let agent = coordinator
            .register(Some("tag"), Some(WALLET))
            .await
            .unwrap();
        assert!(agent.wallet_address.is_none());
    }

    // ------------------------------------------------------------------
    // Paint
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn paint_requires_known_key() {
        let (coordinator, _) = open_coordinator();
        let err = coordinator
            .paint("grf_unknown", &json!([255, 0, 0]), &json!([[0, 0]]))
            .await
            .unwrap_err();
        assert!(matches!(err, GraffitiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn paint_applies_canvas_counter_and_log() {
        let (coordinator, _) = open_coordinator();
        let agent = coordinator.register(Some("tag"), None).await.unwrap();

        let receipt = coordinator
            .paint(&agent.api_key, &json!([255, 0, 0]), &json!([[0, 0], [1, 1]]))
            .await
            .unwrap();
        assert_eq!(receipt.painted, 2);
        assert_eq!(receipt.color, [255, 0, 0]);
        assert_eq!(receipt.agent, "tag");
        assert_eq!(receipt.total_painted, 2);

        let pixels = coordinator.canvas().await.unwrap();
        assert_eq!(pixels.get("0,0"), Some(&"ff0000".to_string()));
        assert_eq!(pixels.get("1,1"), Some(&"ff0000".to_string()));

        let log = coordinator.log().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].agent, "tag");
        assert_eq!(log[0].color, "ff0000");
        assert_eq!(log[0].pixels, vec![[0, 0], [1, 1]]);

        let leaderboard = coordinator.agents().await.unwrap();
        assert_eq!(leaderboard[0].pixels_painted, 2);
    }

    #[tokio::test]
    async fn paint_counter_accumulates_across_batches() {
        let (coordinator, _) = open_coordinator();
        let agent = coordinator.register(Some("tag"), None).await.unwrap();

        coordinator
            .paint(&agent.api_key, &json!([0, 0, 0]), &json!([[0, 0]]))
            .await
            .unwrap();
        let receipt = coordinator
            .paint(&agent.api_key, &json!([0, 0, 0]), &json!([[1, 0], [2, 0]]))
            .await
            .unwrap();
        assert_eq!(receipt.total_painted, 3);
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_wholesale() {
        let (coordinator, store) = open_coordinator();
        let agent = coordinator.register(Some("tag"), None).await.unwrap();

        let batch: Vec<[u32; 2]> = (0..21).map(|i| [0, i]).collect();
        let err = coordinator
            .paint(&agent.api_key, &json!([1, 2, 3]), &json!(batch))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "max 20 pixels per request");

        assert!(store.hgetall(keys::CANVAS).await.unwrap().is_empty());
        assert_eq!(store.list_len(keys::LOG).await, 0);
    }

    #[tokio::test]
    async fn out_of_bounds_pair_rejects_whole_batch() {
        let (coordinator, store) = open_coordinator();
        let agent = coordinator.register(Some("tag"), None).await.unwrap();

        let err = coordinator
            .paint(
                &agent.api_key,
                &json!([1, 2, 3]),
                &json!([[0, 0], [5, 5], [1600, 0]]),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("[1600, 0] out of bounds"));

        // No coordinate applied, not even the valid ones
        assert!(store.hgetall(keys::CANVAS).await.unwrap().is_empty());
        let agent = coordinator.agents().await.unwrap();
        assert_eq!(agent[0].pixels_painted, 0);
    }

    #[tokio::test]
    async fn gated_paint_denies_lapsed_members_and_leaves_state_untouched() {
        let (coordinator, store) = {
            let store = Arc::new(MemoryStore::new());
            // Member at registration time, then the balance is gone: zero
            // TTL makes the second check hit the oracle again.
            struct LapsingOracle(std::sync::atomic::AtomicU64);
            #[async_trait]
            impl BalanceOracle for LapsingOracle {
                async fn has_min_balance(&self, _address: &str) -> std::result::Result<bool, OracleError> {
                    let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(n == 0)
                }
            }
            let gate = MembershipGate::new(
                Arc::new(LapsingOracle(std::sync::atomic::AtomicU64::new(0))),
                Duration::from_millis(0),
            );
            (
                Coordinator::new(Arc::clone(&store) as Arc<dyn KvStore>, Arc::new(gate)),
                store,
            )
        };

        let agent = coordinator
            .register(Some("tag"), Some(WALLET))
            .await
            .unwrap();

        let err = coordinator
            .paint(&agent.api_key, &json!([1, 2, 3]), &json!([[0, 0]]))
            .await
            .unwrap_err();
        assert!(matches!(err, GraffitiError::AccessDenied(_)));

        assert!(store.hgetall(keys::CANVAS).await.unwrap().is_empty());
        assert_eq!(store.list_len(keys::LOG).await, 0);
        assert_eq!(coordinator.agents().await.unwrap()[0].pixels_painted, 0);
    }

    #[tokio::test]
    async fn log_is_bounded_and_newest_first() {
        let (coordinator, store) = open_coordinator();
        let agent = coordinator.register(Some("tag"), None).await.unwrap();

        for i in 0..60 {
            coordinator
                .paint(&agent.api_key, &json!([0, 0, i % 256]), &json!([[0, 0]]))
                .await
                .unwrap();
        }

        let log = coordinator.log().await.unwrap();
        assert_eq!(log.len(), LOG_READ_LIMIT);
        // Newest first: the last paint used color 0000{59:02x}
        assert_eq!(log[0].color, format!("0000{:02x}", 59));
        assert!(store.list_len(keys::LOG).await <= LOG_CAPACITY);
    }

    #[tokio::test]
    async fn log_never_exceeds_capacity() {
        let (coordinator, store) = open_coordinator();
        let agent = coordinator.register(Some("tag"), None).await.unwrap();

        for _ in 0..(LOG_CAPACITY + 5) {
            coordinator
                .paint(&agent.api_key, &json!([9, 9, 9]), &json!([[3, 3]]))
                .await
                .unwrap();
        }

        assert_eq!(store.list_len(keys::LOG).await, LOG_CAPACITY);
    }

    #[tokio::test]
    async fn leaderboard_sorts_by_count_then_age() {
        let (coordinator, _) = open_coordinator();
        let a = coordinator.register(Some("alpha"), None).await.unwrap();
        let b = coordinator.register(Some("beta"), None).await.unwrap();
        coordinator.register(Some("gamma"), None).await.unwrap();

        coordinator
            .paint(&a.api_key, &json!([1, 1, 1]), &json!([[0, 0]]))
            .await
            .unwrap();
        coordinator
            .paint(&b.api_key, &json!([1, 1, 1]), &json!([[0, 1], [0, 2]]))
            .await
            .unwrap();

        let board = coordinator.agents().await.unwrap();
        assert_eq!(board[0].name, "beta");
        assert_eq!(board[1].name, "alpha");
        assert_eq!(board[2].name, "gamma");
    }

    // ------------------------------------------------------------------
    // Accepted non-atomicity of the paint write
    // ------------------------------------------------------------------

    /// Store double that fails every write after the first `allowed` ones,
    /// for observing the divergence window between the three paint writes.
    struct FaultyStore {
        inner: MemoryStore,
        allowed: std::sync::atomic::AtomicI64,
    }

    impl FaultyStore {
        fn failing_after(allowed: i64) -> Self {
            Self {
                inner: MemoryStore::new(),
                allowed: std::sync::atomic::AtomicI64::new(allowed),
            }
        }

        fn admit(&self) -> Result<()> {
            if self
                .allowed
                .fetch_sub(1, std::sync::atomic::Ordering::SeqCst)
                <= 0
            {
                return Err(GraffitiError::Store("injected fault".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KvStore for FaultyStore {
        async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
            self.inner.hget(key, field).await
        }

        async fn hset(&self, key: &str, entries: &[(String, String)]) -> Result<()> {
            self.admit()?;
            self.inner.hset(key, entries).await
        }

        async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
            self.inner.hgetall(key).await
        }

        async fn lpush_trim(&self, key: &str, value: &str, keep: usize) -> Result<()> {
            self.admit()?;
            self.inner.lpush_trim(key, value, keep).await
        }

        async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
            self.inner.lrange(key, start, stop).await
        }
    }

    #[tokio::test]
    async fn crash_between_canvas_and_counter_leaves_them_divergent() {
        // Registration needs 2 writes (record + name index); the paint's
        // canvas write is the 3rd. Everything after fails.
        let store = Arc::new(FaultyStore::failing_after(3));
        let coordinator = Coordinator::new(
            Arc::clone(&store) as Arc<dyn KvStore>,
            Arc::new(MembershipGate::disabled()),
        );

        let agent = coordinator.register(Some("tag"), None).await.unwrap();
        let err = coordinator
            .paint(&agent.api_key, &json!([255, 0, 0]), &json!([[0, 0]]))
            .await
            .unwrap_err();
        assert!(matches!(err, GraffitiError::Store(_)));

        // Canvas took the write; counter and log did not. This divergence
        // is the documented best-effort model, not a bug.
        let pixels = store.inner.hgetall(keys::CANVAS).await.unwrap();
        assert_eq!(pixels.get("0,0"), Some(&"ff0000".to_string()));
        let surviving = coordinator.agents().await.unwrap();
        assert_eq!(surviving[0].pixels_painted, 0);
        assert_eq!(store.inner.list_len(keys::LOG).await, 0);
    }
}
