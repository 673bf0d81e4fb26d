//! In-memory collaborator doubles for exercising the anchor and verify
//! pipelines without a network. Test-only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{AnchorError, Result};
use crate::ledger::{encode_labeled, AnchorMetadata, LedgerClient};
use crate::storage::{content_tag, ContentStore, StoredObject};

/// In-memory content store. Locators are sequential ("mem-0", "mem-1").
pub struct MemoryStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            puts: AtomicUsize::new(0),
        }
    }

    /// Number of `put` calls observed.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of objects currently held (orphans included).
    pub fn object_count(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    /// Replace the bytes behind a locator, simulating off-chain tampering.
    pub fn tamper(&self, locator: &str, bytes: Vec<u8>) {
        self.objects
            .write()
            .unwrap()
            .insert(locator.to_string(), bytes);
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, data: &[u8]) -> Result<StoredObject> {
        let n = self.puts.fetch_add(1, Ordering::SeqCst);
        let locator = format!("mem-{n}");
        self.objects
            .write()
            .unwrap()
            .insert(locator.clone(), data.to_vec());
        Ok(StoredObject {
            locator,
            content_hash: content_tag(data),
            size: data.len() as u64,
        })
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .unwrap()
            .get(locator)
            .cloned()
            .ok_or_else(|| AnchorError::ContentUnavailable(format!("no object at {locator}")))
    }

    async fn exists(&self, locator: &str) -> Result<bool> {
        Ok(self.objects.read().unwrap().contains_key(locator))
    }
}

/// How an injected submission failure should present.
#[derive(Debug, Clone, Copy)]
pub enum SubmitFailure {
    InsufficientFunds,
    Unavailable,
}

/// In-memory ledger. Transaction ids are sequential ("0xmem0", "0xmem1").
pub struct MemoryLedger {
    transactions: RwLock<HashMap<String, AnchorMetadata>>,
    submits: AtomicUsize,
    fail_submit: RwLock<Option<SubmitFailure>>,
    label: u64,
    max_payload_bytes: usize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_max_payload_bytes(16 * 1024)
    }

    pub fn with_max_payload_bytes(max_payload_bytes: usize) -> Self {
        Self {
            transactions: RwLock::new(HashMap::new()),
            submits: AtomicUsize::new(0),
            fail_submit: RwLock::new(None),
            label: 1337,
            max_payload_bytes,
        }
    }

    /// Make subsequent submissions fail (or succeed again with `None`).
    pub fn set_submit_failure(&self, failure: Option<SubmitFailure>) {
        *self.fail_submit.write().unwrap() = failure;
    }

    /// Number of `submit` calls observed (failed ones included).
    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    /// Number of transactions recorded.
    pub fn transaction_count(&self) -> usize {
        self.transactions.read().unwrap().len()
    }

    /// The recorded payload for a transaction, if any.
    pub fn metadata_for(&self, tx_id: &str) -> Option<AnchorMetadata> {
        self.transactions.read().unwrap().get(tx_id).cloned()
    }

    /// Overwrite a recorded payload, simulating on-chain garbage.
    pub fn tamper_metadata(&self, tx_id: &str, metadata: AnchorMetadata) {
        self.transactions
            .write()
            .unwrap()
            .insert(tx_id.to_string(), metadata);
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    fn name(&self) -> &str {
        "memory"
    }

    fn check_payload(&self, payload: &AnchorMetadata) -> Result<()> {
        let encoded = encode_labeled(self.label, payload)?;
        if encoded.len() > self.max_payload_bytes {
            return Err(AnchorError::PayloadTooLarge {
                size: encoded.len(),
                limit: self.max_payload_bytes,
            });
        }
        Ok(())
    }

    async fn submit(&self, payload: &AnchorMetadata) -> Result<String> {
        self.check_payload(payload)?;
        let n = self.submits.fetch_add(1, Ordering::SeqCst);
        match *self.fail_submit.read().unwrap() {
            Some(SubmitFailure::InsufficientFunds) => {
                return Err(AnchorError::InsufficientFunds("balance too low".into()))
            }
            Some(SubmitFailure::Unavailable) => {
                return Err(AnchorError::LedgerSubmissionFailed("node unreachable".into()))
            }
            None => {}
        }
        let tx_id = format!("0xmem{n}");
        self.transactions
            .write()
            .unwrap()
            .insert(tx_id.clone(), payload.clone());
        Ok(tx_id)
    }

    async fn lookup(&self, tx_id: &str) -> Result<AnchorMetadata> {
        self.transactions
            .read()
            .unwrap()
            .get(tx_id)
            .cloned()
            .ok_or_else(|| AnchorError::TransactionNotFound(tx_id.to_string()))
    }

    async fn confirmation(&self, tx_id: &str) -> Result<Option<u64>> {
        if self.transactions.read().unwrap().contains_key(tx_id) {
            Ok(Some(1))
        } else {
            Ok(None)
        }
    }
}
