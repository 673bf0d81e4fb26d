//! Arweave permanent-storage backend.
//!
//! Arweave stores data permanently for a one-time payment. Proposals are
//! small JSON documents, well inside the economical range. Uploads go
//! through a bundler (Irys/Bundlr-style endpoint), which batches data
//! items into Arweave transactions for lower cost and faster
//! confirmation; retrieval goes through a gateway by transaction id.
//!
//! Freshly uploaded items can take a short while to propagate to
//! gateways, so a failed retrieval surfaces as `ContentUnavailable`,
//! which callers may retry later.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{content_tag, ContentStore, StoredObject};
use crate::error::{AnchorError, Result};
use crate::retry::{with_backoff, RetryPolicy};

/// Tag value identifying uploads from this application.
const APP_NAME: &str = "proposal-anchor";

/// Configuration for Arweave access.
#[derive(Debug, Clone)]
pub struct ArweaveConfig {
    /// Gateway URL for retrieval (e.g., "https://arweave.net").
    pub gateway_url: String,
    /// Bundler/uploader URL (e.g., an Irys endpoint).
    pub bundler_url: String,
    /// API key or wallet token for the bundler.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for transient transport faults.
    pub retry: RetryPolicy,
}

/// Arweave content store.
pub struct ArweaveStore {
    client: Client,
    config: ArweaveConfig,
}

/// Bundler upload response.
#[derive(Debug, Deserialize)]
struct BundlerResponse {
    /// Transaction ID on Arweave.
    id: String,
}

impl ArweaveStore {
    pub fn new(config: ArweaveConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnchorError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn upload_once(&self, data: &[u8], content_hash: &[u8; 32]) -> Result<StoredObject> {
        let resp = self
            .client
            .post(format!("{}/tx", self.config.bundler_url))
            .header("Content-Type", "application/json")
            .header("X-Api-Key", &self.config.api_key)
            // Arweave tags for later discovery
            .header("X-Tag-App-Name", APP_NAME)
            .header("X-Tag-Content-Type", "application/json")
            .header("X-Tag-Content-Hash", hex::encode(content_hash))
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| AnchorError::StoreUnavailable(format!("arweave upload: {e}")))?;

        if resp.status() == StatusCode::PAYMENT_REQUIRED {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnchorError::InsufficientFunds(format!(
                "arweave bundler balance too low: {body}"
            )));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AnchorError::StoreUnavailable(format!(
                "arweave upload failed ({status}): {body}"
            )));
        }

        let bundler: BundlerResponse = resp.json().await.map_err(|e| {
            AnchorError::StoreUnavailable(format!("arweave bundler response: {e}"))
        })?;

        Ok(StoredObject {
            locator: bundler.id,
            content_hash: *content_hash,
            size: data.len() as u64,
        })
    }

    async fn download_once(&self, locator: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(format!("{}/{locator}", self.config.gateway_url))
            .send()
            .await
            .map_err(|e| AnchorError::StoreUnavailable(format!("arweave download: {e}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(AnchorError::ContentUnavailable(format!(
                "arweave object {locator} not yet propagated or unknown"
            )));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(AnchorError::StoreUnavailable(format!(
                "arweave download failed ({status})"
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AnchorError::StoreUnavailable(format!("arweave download body: {e}")))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ContentStore for ArweaveStore {
    fn name(&self) -> &str {
        "arweave"
    }

    /// Upload permanently via the bundler. Insufficient bundler balance
    /// (HTTP 402) surfaces immediately and is never retried; funds must
    /// be replenished out of band.
    async fn put(&self, data: &[u8]) -> Result<StoredObject> {
        let content_hash = content_tag(data);
        with_backoff(&self.config.retry, "arweave put", || {
            self.upload_once(data, &content_hash)
        })
        .await
    }

    /// Download by Arweave transaction id.
    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        with_backoff(&self.config.retry, "arweave get", || {
            self.download_once(locator)
        })
        .await
    }

    /// Check whether the gateway can serve the transaction.
    async fn exists(&self, locator: &str) -> Result<bool> {
        let resp = self
            .client
            .head(format!("{}/{locator}", self.config.gateway_url))
            .send()
            .await
            .map_err(|e| AnchorError::StoreUnavailable(format!("arweave head: {e}")))?;

        Ok(resp.status().is_success())
    }
}
