//! Token balance oracle
//!
//! Asks an ERC-20 contract whether a wallet holds the minimum balance, via
//! JSON-RPC `eth_call` of `balanceOf(address)`. The oracle reports three
//! outcomes: holds enough (`Ok(true)`), does not (`Ok(false)`), or could
//! not tell (`Err`). Collapsing the error case into a denial is the gate's
//! job, not the oracle's.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// balanceOf(address) selector
const BALANCE_OF_SELECTOR: &str = "70a08231";

/// Why an oracle query produced no verdict
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("malformed address: {0}")]
    BadAddress(String),

    #[error("rpc transport: {0}")]
    Transport(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("malformed rpc response: {0}")]
    BadResponse(String),
}

/// Balance source behind the membership gate
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Whether `address` currently holds the minimum balance.
    async fn has_min_balance(&self, address: &str) -> Result<bool, OracleError>;
}

/// Syntactic check for a 0x-prefixed 20-byte hex address.
pub fn is_valid_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// ERC-20 balance oracle over JSON-RPC
pub struct Erc20Oracle {
    client: reqwest::Client,
    rpc_url: String,
    token_address: String,
    min_balance_wei: u128,
}

impl Erc20Oracle {
    pub fn new(rpc_url: String, token_address: String, min_balance_wei: u128, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            rpc_url,
            token_address,
            min_balance_wei,
        }
    }
}

#[async_trait]
impl BalanceOracle for Erc20Oracle {
    async fn has_min_balance(&self, address: &str) -> Result<bool, OracleError> {
        if !is_valid_address(address) {
            return Err(OracleError::BadAddress(address.to_string()));
        }

        // balanceOf(address): selector + address left-padded to 32 bytes
        let data = format!(
            "0x{}000000000000000000000000{}",
            BALANCE_OF_SELECTOR,
            address[2..].to_lowercase()
        );
        let call = json!({ "to": self.token_address, "data": data });
        let payload = json!({
            "jsonrpc": "2.0",
            "method": "eth_call",
            "params": [call, "latest"],
            "id": 1,
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| OracleError::BadResponse(e.to_string()))?;

        if let Some(err) = body.get("error") {
            return Err(OracleError::Rpc(err.to_string()));
        }

        let result = body
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| OracleError::BadResponse(body.to_string()))?;

        let balance = parse_u256_hex(result)?;
        Ok(balance >= self.min_balance_wei)
    }
}

/// Parse a 0x-prefixed 256-bit hex quantity, saturating at u128::MAX.
///
/// Realistic balances fit comfortably in 128 bits; anything larger is
/// certainly above any configured minimum.
fn parse_u256_hex(raw: &str) -> Result<u128, OracleError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Ok(0);
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(OracleError::BadResponse(format!("not a hex quantity: {}", raw)));
    }

    let significant = digits.trim_start_matches('0');
    if significant.len() > 32 {
        return Ok(u128::MAX);
    }
    if significant.is_empty() {
        return Ok(0);
    }

    u128::from_str_radix(significant, 16)
        .map_err(|e| OracleError::BadResponse(format!("bad hex quantity {}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_validation() {
        assert!(is_valid_address("0x299c30DD5974BF4D5bFE42C340CA40462816AB07"));
        assert!(!is_valid_address("299c30DD5974BF4D5bFE42C340CA40462816AB07"));
        assert!(!is_valid_address("0x299c30"));
        assert!(!is_valid_address("0xZZZc30DD5974BF4D5bFE42C340CA40462816AB07"));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn parses_zero_balance() {
        let zero = format!("0x{}", "0".repeat(64));
        assert_eq!(parse_u256_hex(&zero).unwrap(), 0);
        assert_eq!(parse_u256_hex("0x").unwrap(), 0);
    }

    #[test]
    fn parses_one_token() {
        // 10^18 wei
        assert_eq!(
            parse_u256_hex("0x0de0b6b3a7640000").unwrap(),
            1_000_000_000_000_000_000
        );
    }

    #[test]
    fn saturates_absurd_balances() {
        let huge = format!("0x{}", "f".repeat(64));
        assert_eq!(parse_u256_hex(&huge).unwrap(), u128::MAX);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_u256_hex("0xnothex").is_err());
    }
}
