//! Pluggable content-store abstraction.
//!
//! The anchor protocol treats off-chain storage as a black box with two
//! essential operations: persist raw bytes and get them back by an opaque
//! locator. Two backends are supported, selected by configuration:
//! - Arweave: decentralized permanent storage (bundler upload, gateway
//!   retrieval); the locator is the Arweave transaction id.
//! - IPFS: content-addressed distribution; the locator is the CID.
//!
//! Both stores are append-only by assumption. Nothing is ever deleted, so
//! an object orphaned by a failed ledger submission simply stays put.
pub mod arweave;
pub mod ipfs;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Config, StoreKind};
use crate::error::Result;

/// Metadata returned after a successful store write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    /// Opaque locator, sufficient and necessary for later retrieval.
    pub locator: String,
    /// BLAKE3 content tag of the stored bytes. A store-level integrity
    /// marker (attached as an upload tag where the backend supports
    /// tagging), distinct from the protocol fingerprint.
    pub content_hash: [u8; 32],
    /// Size in bytes of the stored data.
    pub size: u64,
}

/// Trait for pluggable content stores.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Backend name as recorded in ledger metadata ("arweave", "ipfs").
    fn name(&self) -> &str;

    /// Persist raw bytes. Returns the locator for later retrieval.
    async fn put(&self, data: &[u8]) -> Result<StoredObject>;

    /// Retrieve bytes by locator.
    async fn get(&self, locator: &str) -> Result<Vec<u8>>;

    /// Check whether an object is currently retrievable.
    async fn exists(&self, locator: &str) -> Result<bool>;
}

/// Build the store backend selected by configuration.
pub fn build_store(config: &Config) -> Result<Box<dyn ContentStore>> {
    match config.store {
        StoreKind::Arweave => Ok(Box::new(arweave::ArweaveStore::new(
            config.arweave.clone(),
        )?)),
        StoreKind::Ipfs => Ok(Box::new(ipfs::IpfsStore::new(config.ipfs.clone())?)),
    }
}

/// BLAKE3 content tag for stored bytes.
pub(crate) fn content_tag(data: &[u8]) -> [u8; 32] {
    blake3::hash(data).into()
}
