//! IPFS content store via the Kubo HTTP API.
//!
//! IPFS is content-addressed: the locator returned from `put` is the CID
//! derived from the data itself. Persistence is not guaranteed by the
//! network — uploads are pinned on the local node, and durability beyond
//! that is an operational concern outside the protocol.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;

use super::{content_tag, ContentStore, StoredObject};
use crate::error::{AnchorError, Result};
use crate::retry::{with_backoff, RetryPolicy};

/// Configuration for the IPFS HTTP API.
#[derive(Debug, Clone)]
pub struct IpfsConfig {
    /// IPFS API endpoint (e.g., "http://localhost:5001").
    pub api_url: String,
    /// Gateway URL for direct reads (e.g., "http://localhost:8080").
    pub gateway_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for transient transport faults.
    pub retry: RetryPolicy,
}

/// IPFS content store.
pub struct IpfsStore {
    client: Client,
    config: IpfsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IpfsAddResponse {
    hash: String,
}

impl IpfsStore {
    pub fn new(config: IpfsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnchorError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn add_once(&self, data: &[u8], content_hash: &[u8; 32]) -> Result<StoredObject> {
        let part = multipart::Part::bytes(data.to_vec()).file_name("proposal.json");
        let form = multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(format!("{}/api/v0/add", self.config.api_url))
            .query(&[("pin", "true"), ("cid-version", "1")])
            .multipart(form)
            .send()
            .await
            .map_err(|e| AnchorError::StoreUnavailable(format!("ipfs add: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AnchorError::StoreUnavailable(format!(
                "ipfs add failed ({status}): {body}"
            )));
        }

        let add_resp: IpfsAddResponse = resp
            .json()
            .await
            .map_err(|e| AnchorError::StoreUnavailable(format!("ipfs add response: {e}")))?;

        Ok(StoredObject {
            locator: add_resp.hash,
            content_hash: *content_hash,
            size: data.len() as u64,
        })
    }

    async fn cat_once(&self, locator: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .post(format!("{}/api/v0/cat", self.config.api_url))
            .query(&[("arg", locator)])
            .send()
            .await
            .map_err(|e| AnchorError::StoreUnavailable(format!("ipfs cat: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AnchorError::ContentUnavailable(format!(
                "ipfs cat {locator} failed ({status}): {body}"
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AnchorError::StoreUnavailable(format!("ipfs cat body: {e}")))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ContentStore for IpfsStore {
    fn name(&self) -> &str {
        "ipfs"
    }

    /// Add and pin. The CID is the locator.
    async fn put(&self, data: &[u8]) -> Result<StoredObject> {
        let content_hash = content_tag(data);
        with_backoff(&self.config.retry, "ipfs put", || {
            self.add_once(data, &content_hash)
        })
        .await
    }

    /// Retrieve by CID.
    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        with_backoff(&self.config.retry, "ipfs get", || self.cat_once(locator)).await
    }

    /// Check whether the CID is pinned on the local node.
    async fn exists(&self, locator: &str) -> Result<bool> {
        let resp = self
            .client
            .post(format!("{}/api/v0/pin/ls", self.config.api_url))
            .query(&[("arg", locator)])
            .send()
            .await
            .map_err(|e| AnchorError::StoreUnavailable(format!("ipfs pin/ls: {e}")))?;

        Ok(resp.status().is_success())
    }
}
