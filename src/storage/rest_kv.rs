//! Key-value storage over a Redis REST API.
//!
//! Speaks the Upstash REST protocol also used by Vercel KV:
//! `GET {base}/get/{key}` answers `{"result": "<value>"}` or
//! `{"result": null}`, `POST {base}/set/{key}` stores the request body.
//! The snapshot is stored as a JSON string value.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Listing, RestKvConfig};
use crate::storage::{Snapshot, SnapshotStore};

const KV_TIMEOUT_SECS: u64 = 10;

/// Envelope of every REST KV response.
#[derive(Debug, Deserialize)]
struct KvResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Snapshot store backed by a REST key-value service.
pub struct RestKvStorage {
    client: Client,
    base_url: Url,
    token: String,
}

impl RestKvStorage {
    pub fn new(config: RestKvConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(KV_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(&config.base_url)?,
            token: config.token,
        })
    }

    /// `{base}/{command}/{key}` with the key percent-encoded as one segment.
    fn command_url(&self, command: &str, key: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::config(format!("KV base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .push(command)
            .push(key);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<KvResponse> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(AppError::store)?;

        let status = response.status();
        let text = response.text().await.map_err(AppError::store)?;
        let body: KvResponse = serde_json::from_str(&text)
            .map_err(|e| AppError::store(format!("unexpected KV response ({status}): {e}")))?;

        if let Some(error) = body.error {
            return Err(AppError::store(format!("KV error ({status}): {error}")));
        }
        if !status.is_success() {
            return Err(AppError::store(format!("KV request failed with {status}")));
        }
        Ok(body)
    }
}

/// Decode the `result` field of a GET into a snapshot.
fn decode_snapshot(result: Option<serde_json::Value>) -> Result<Option<Snapshot>> {
    let snapshot = match result {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(raw)) => Some(serde_json::from_str(&raw)?),
        Some(value) => Some(serde_json::from_value(value)?),
    };
    Ok(snapshot)
}

#[async_trait]
impl SnapshotStore for RestKvStorage {
    async fn get(&self, key: &str) -> Result<Option<Snapshot>> {
        let url = self.command_url("get", key)?;
        let body = self.send(self.client.get(url)).await?;

        let snapshot = decode_snapshot(body.result)
            .map_err(|e| AppError::store(format!("decoding snapshot '{key}': {e}")))?;
        if snapshot.is_none() {
            log::warn!("No snapshot stored under '{}'", key);
        }
        Ok(snapshot)
    }

    async fn put(&self, key: &str, listings: &[Listing]) -> Result<Snapshot> {
        let snapshot = Snapshot::new(listings.to_vec());
        let payload = serde_json::to_string(&snapshot)?;

        let url = self.command_url("set", key)?;
        self.send(self.client.post(url).body(payload)).await?;

        log::info!(
            "Snapshot: {} listings written to KV key '{}'",
            snapshot.listings.len(),
            key
        );
        Ok(snapshot)
    }
}
