//! Upstash Redis REST client
//!
//! Speaks the Upstash REST protocol: a command is POSTed to the endpoint as
//! a JSON array (`["HGET", "key", "field"]`) with a bearer token, and the
//! reply is `{"result": ...}` or `{"error": "..."}`. Batches go to
//! `/pipeline` as an array of commands.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

use crate::db::KvStore;
use crate::types::{GraffitiError, Result};

/// Upstash Redis REST store backend
#[derive(Clone)]
pub struct RedisStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RedisStore {
    /// Connect to the REST endpoint and verify it with a PING.
    pub async fn connect(url: &str, token: &str, timeout: Duration) -> Result<Self> {
        info!("Connecting to Upstash Redis at {}", url);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let store = Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        };

        let pong = store.command(&["PING"]).await?;
        if pong.as_str() != Some("PONG") {
            return Err(GraffitiError::Store(format!(
                "unexpected PING reply: {}",
                pong
            )));
        }

        info!("Upstash Redis connected");
        Ok(store)
    }

    /// Execute a single command and return its `result` payload.
    async fn command(&self, cmd: &[&str]) -> Result<Value> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&cmd)
            .send()
            .await
            .map_err(|e| GraffitiError::Store(format!("store request failed: {}", e)))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| GraffitiError::Store(format!("store reply unreadable: {}", e)))?;

        Self::unwrap_result(body)
    }

    /// Execute a batch of commands in one round trip.
    async fn pipeline(&self, cmds: &[Vec<String>]) -> Result<Vec<Value>> {
        let response = self
            .client
            .post(format!("{}/pipeline", self.base_url))
            .bearer_auth(&self.token)
            .json(&cmds)
            .send()
            .await
            .map_err(|e| GraffitiError::Store(format!("store pipeline failed: {}", e)))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| GraffitiError::Store(format!("store reply unreadable: {}", e)))?;

        let items = match body {
            Value::Array(items) => items,
            other => {
                return Err(GraffitiError::Store(format!(
                    "pipeline reply is not an array: {}",
                    other
                )))
            }
        };

        items.into_iter().map(Self::unwrap_result).collect()
    }

    fn unwrap_result(body: Value) -> Result<Value> {
        if let Some(err) = body.get("error").and_then(Value::as_str) {
            return Err(GraffitiError::Store(format!("store rejected command: {}", err)));
        }
        match body {
            Value::Object(mut map) => Ok(map.remove("result").unwrap_or(Value::Null)),
            other => Err(GraffitiError::Store(format!(
                "store reply missing result: {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let result = self.command(&["HGET", key, field]).await?;
        Ok(result.as_str().map(str::to_string))
    }

    async fn hset(&self, key: &str, entries: &[(String, String)]) -> Result<()> {
        let mut cmd = vec!["HSET", key];
        for (field, value) in entries {
            cmd.push(field);
            cmd.push(value);
        }
        self.command(&cmd).await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        // Upstash returns HGETALL as a flat [field, value, field, value] array
        let result = self.command(&["HGETALL", key]).await?;
        let items = match result {
            Value::Array(items) => items,
            Value::Null => return Ok(HashMap::new()),
            other => {
                return Err(GraffitiError::Store(format!(
                    "HGETALL reply is not an array: {}",
                    other
                )))
            }
        };

        let mut map = HashMap::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
            if let (Some(f), Some(v)) = (field.as_str(), value.as_str()) {
                map.insert(f.to_string(), v.to_string());
            }
        }
        Ok(map)
    }

    async fn lpush_trim(&self, key: &str, value: &str, keep: usize) -> Result<()> {
        // One round trip; the list can still briefly exceed `keep` between
        // the two commands on the server side, which is accepted.
        let stop = keep.saturating_sub(1).to_string();
        self.pipeline(&[
            vec!["LPUSH".to_string(), key.to_string(), value.to_string()],
            vec!["LTRIM".to_string(), key.to_string(), "0".to_string(), stop],
        ])
        .await?;
        Ok(())
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let result = self
            .command(&["LRANGE", key, &start.to_string(), &stop.to_string()])
            .await?;
        let items = match result {
            Value::Array(items) => items,
            Value::Null => return Ok(Vec::new()),
            other => {
                return Err(GraffitiError::Store(format!(
                    "LRANGE reply is not an array: {}",
                    other
                )))
            }
        };
        Ok(items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwrap_result_extracts_payload() {
        let value = RedisStore::unwrap_result(json!({"result": "PONG"})).unwrap();
        assert_eq!(value, json!("PONG"));
    }

    #[test]
    fn unwrap_result_surfaces_store_errors() {
        let err = RedisStore::unwrap_result(json!({"error": "WRONGTYPE"})).unwrap_err();
        assert!(err.to_string().contains("WRONGTYPE"));
    }

    #[test]
    fn unwrap_result_tolerates_null() {
        let value = RedisStore::unwrap_result(json!({"result": null})).unwrap();
        assert!(value.is_null());
    }
}
