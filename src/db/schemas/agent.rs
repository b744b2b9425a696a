//! Agent record schema
//!
//! One record per registered agent, stored as JSON in the agents hash keyed
//! by api_key. Created on registration, never deleted; only the paint
//! counter mutates afterwards.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A registered agent
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Agent {
    /// Display name (1-32 chars, unique modulo case)
    pub name: String,

    /// Opaque bearer secret; the sole authentication token
    pub api_key: String,

    /// Chain wallet address, present on gated deployments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,

    /// RFC 3339 creation timestamp
    pub created_at: String,

    /// Lifetime pixels painted; survives log truncation
    #[serde(default)]
    pub pixels_painted: u64,
}

impl Agent {
    /// Create a fresh agent record with a zero counter.
    pub fn new(name: String, api_key: String, wallet_address: Option<String>) -> Self {
        Self {
            name,
            api_key,
            wallet_address,
            created_at: Utc::now().to_rfc3339(),
            pixels_painted: 0,
        }
    }
}
