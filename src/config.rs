//! Configuration for the Graffiti gateway
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::gate::oracle::is_valid_address;

/// Graffiti - HTTP gateway for a shared collaborative pixel canvas
#[derive(Parser, Debug, Clone)]
#[command(name = "graffiti")]
#[command(about = "HTTP gateway for the Graffiti shared pixel canvas")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Upstash Redis REST endpoint (required unless DEV_MODE)
    #[arg(long, env = "UPSTASH_REDIS_REST_URL")]
    pub store_url: Option<String>,

    /// Upstash Redis REST bearer token (required unless DEV_MODE)
    #[arg(long, env = "UPSTASH_REDIS_REST_TOKEN")]
    pub store_token: Option<String>,

    /// ERC-20 token contract that gates membership
    /// When unset, gating is disabled and every request is admitted
    #[arg(long, env = "GRAFFITI_TOKEN_ADDRESS")]
    pub token_address: Option<String>,

    /// JSON-RPC endpoint used for balance queries
    #[arg(long, env = "BASE_RPC_URL", default_value = "https://mainnet.base.org")]
    pub rpc_url: String,

    /// Minimum whole-token balance required for membership
    #[arg(long, env = "MIN_TOKEN_BALANCE", default_value = "1")]
    pub min_token_balance: u64,

    /// Seconds a membership verdict is served from cache before the
    /// oracle is consulted again
    #[arg(long, env = "MEMBERSHIP_CACHE_TTL_SECS", default_value = "300")]
    pub membership_ttl_secs: u64,

    /// Store request timeout in milliseconds
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value = "30000")]
    pub store_timeout_ms: u64,

    /// Oracle request timeout in milliseconds (timeout is the fail-closed path)
    #[arg(long, env = "ORACLE_TIMEOUT_MS", default_value = "10000")]
    pub oracle_timeout_ms: u64,

    /// Enable development mode (in-memory store fallback)
    #[arg(long, env = "DEV_MODE", action = clap::ArgAction::Set, default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Whether token-balance gating is configured
    pub fn gating_enabled(&self) -> bool {
        self.token_address.is_some()
    }

    /// Minimum balance in wei (18 decimals)
    pub fn min_balance_wei(&self) -> u128 {
        self.min_token_balance as u128 * 10u128.pow(18)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && (self.store_url.is_none() || self.store_token.is_none()) {
            return Err(
                "UPSTASH_REDIS_REST_URL and UPSTASH_REDIS_REST_TOKEN are required in production mode"
                    .to_string(),
            );
        }

        if let Some(ref addr) = self.token_address {
            if !is_valid_address(addr) {
                return Err(format!(
                    "GRAFFITI_TOKEN_ADDRESS is not a valid 0x-prefixed address: {}",
                    addr
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["graffiti", "--dev-mode", "true"])
    }

    #[test]
    fn dev_mode_allows_missing_store() {
        let args = base_args();
        assert!(args.validate().is_ok());
        assert!(!args.gating_enabled());
    }

    #[test]
    fn production_requires_store_credentials() {
        let args = Args::parse_from(["graffiti"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn token_address_is_validated() {
        let mut args = base_args();
        args.token_address = Some("not-an-address".to_string());
        assert!(args.validate().is_err());

        args.token_address = Some("0x299c30DD5974BF4D5bFE42C340CA40462816AB07".to_string());
        assert!(args.validate().is_ok());
        assert!(args.gating_enabled());
    }

    #[test]
    fn min_balance_converts_to_wei() {
        let mut args = base_args();
        args.min_token_balance = 3;
        assert_eq!(args.min_balance_wei(), 3_000_000_000_000_000_000u128);
    }
}
