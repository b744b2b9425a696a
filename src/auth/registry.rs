//! Agent registry over the shared store
//!
//! Owns the credential hash and the two uniqueness indexes (names, wallets).
//! The writes behind `insert` are separate store round trips; a crash
//! between them can leave a credential without an index entry, which is
//! accepted rather than transactionally guarded.

use std::sync::Arc;
use tracing::warn;

use crate::db::schemas::Agent;
use crate::db::{keys, KvStore};
use crate::types::{GraffitiError, Result};

/// Credential store facade
#[derive(Clone)]
pub struct AgentRegistry {
    store: Arc<dyn KvStore>,
}

impl AgentRegistry {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Resolve an api_key to its agent record.
    pub async fn resolve(&self, api_key: &str) -> Result<Option<Agent>> {
        let Some(raw) = self.store.hget(keys::AGENTS, api_key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(agent) => Ok(Some(agent)),
            Err(e) => {
                warn!("Corrupt agent record for key ending {}: {}", tail(api_key), e);
                Err(GraffitiError::Internal("corrupt agent record".to_string()))
            }
        }
    }

    /// Whether a display name is already claimed (case-insensitive).
    pub async fn name_taken(&self, name: &str) -> Result<bool> {
        Ok(self
            .store
            .hget(keys::AGENT_NAMES, &name.to_lowercase())
            .await?
            .is_some())
    }

    /// Whether a wallet address is already bound to an agent.
    pub async fn wallet_taken(&self, wallet: &str) -> Result<bool> {
        Ok(self
            .store
            .hget(keys::AGENT_WALLETS, &wallet.to_lowercase())
            .await?
            .is_some())
    }

    /// Write a fresh agent: record first, then the uniqueness indexes.
    pub async fn insert(&self, agent: &Agent) -> Result<()> {
        self.persist(agent).await?;

        self.store
            .hset(
                keys::AGENT_NAMES,
                &[(agent.name.to_lowercase(), agent.api_key.clone())],
            )
            .await?;

        if let Some(ref wallet) = agent.wallet_address {
            self.store
                .hset(
                    keys::AGENT_WALLETS,
                    &[(wallet.to_lowercase(), agent.api_key.clone())],
                )
                .await?;
        }

        Ok(())
    }

    /// Persist the current state of an agent record (counter updates).
    pub async fn persist(&self, agent: &Agent) -> Result<()> {
        let raw = serde_json::to_string(agent)
            .map_err(|e| GraffitiError::Internal(format!("agent encode failed: {}", e)))?;
        self.store
            .hset(keys::AGENTS, &[(agent.api_key.clone(), raw)])
            .await
    }

    /// Enumerate every agent record; corrupt entries are skipped with a
    /// warning rather than failing the whole read.
    pub async fn list(&self) -> Result<Vec<Agent>> {
        let raw = self.store.hgetall(keys::AGENTS).await?;
        let mut agents = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            match serde_json::from_str::<Agent>(&value) {
                Ok(agent) => agents.push(agent),
                Err(e) => warn!("Skipping corrupt agent record for key ending {}: {}", tail(&key), e),
            }
        }
        Ok(agents)
    }
}

/// Last few characters of a credential, safe to log.
fn tail(api_key: &str) -> &str {
    let start = api_key.len().saturating_sub(6);
    api_key.get(start..).unwrap_or("")
}
