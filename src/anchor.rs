//! Anchor pipeline: canonicalize, store off-chain, commit on-chain.
//!
//! Coordinates the full anchor flow:
//! 1. Canonicalize the proposal and compute its fingerprint
//! 2. Pre-flight the metadata payload against the ledger size ceiling
//! 3. Store the raw document in the content store
//! 4. Submit `{fingerprint, locator}` to the ledger under the metadata
//!    label
//!
//! The off-chain write always precedes the on-chain write. If the ledger
//! submission fails (or the operation is cancelled) after the store
//! write, the stored object is orphaned: unreferenced by any ledger
//! record. That is accepted — permanent stores are non-deletable, so the
//! remedy is to retry the anchor, which produces a fresh locator. No
//! rollback is attempted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::ledger::{AnchorMetadata, LedgerClient, PAYLOAD_KIND};
use crate::proposal::Proposal;
use crate::storage::ContentStore;

/// Upper bound on locator length across supported store backends, used to
/// pre-check the payload size before any network call (Arweave ids are 43
/// characters, IPFS CIDv1 around 59).
pub const MAX_LOCATOR_LEN: usize = 128;

/// The durable record of one successful anchor operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorRecord {
    /// Ledger transaction id — the durable external handle.
    pub transaction_id: String,
    /// Content-store locator of the raw document.
    pub storage_locator: String,
    /// Store backend holding the document.
    pub storage: String,
    /// SHA-256 fingerprint of the proposal's canonical bytes.
    pub fingerprint: Fingerprint,
    /// When the anchor completed.
    pub created_at: DateTime<Utc>,
}

/// Anchor a proposal: store the raw document off-chain, then commit its
/// fingerprint and locator to the ledger.
pub async fn anchor_proposal(
    proposal: &Proposal,
    store: &dyn ContentStore,
    ledger: &dyn LedgerClient,
) -> Result<AnchorRecord> {
    let canonical = proposal.canonical_bytes();
    let fingerprint = Fingerprint::compute(&canonical);
    info!(fingerprint = %fingerprint, "Proposal canonicalized");

    // Pre-flight the payload size with a worst-case locator so an
    // oversized anchor fails before any network call, leaving no orphan.
    let draft = AnchorMetadata {
        fingerprint: fingerprint.to_hex(),
        storage_locator: "x".repeat(MAX_LOCATOR_LEN),
        storage: store.name().to_string(),
        anchored_at: Utc::now().timestamp(),
        kind: PAYLOAD_KIND.to_string(),
    };
    ledger.check_payload(&draft)?;

    let raw = proposal.to_raw_bytes()?;
    let stored = store.put(&raw).await?;
    info!(
        backend = store.name(),
        locator = %stored.locator,
        size = stored.size,
        "Document stored off-chain"
    );

    let payload = AnchorMetadata {
        storage_locator: stored.locator.clone(),
        ..draft
    };

    let transaction_id = match ledger.submit(&payload).await {
        Ok(tx_id) => tx_id,
        Err(e) => {
            warn!(
                locator = %stored.locator,
                error = %e,
                "Ledger submission failed after off-chain write; stored object is orphaned"
            );
            return Err(e);
        }
    };

    info!(
        tx_id = %transaction_id,
        fingerprint = %fingerprint,
        "Proposal anchored"
    );

    Ok(AnchorRecord {
        transaction_id,
        storage_locator: stored.locator,
        storage: store.name().to_string(),
        fingerprint,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnchorError;
    use crate::testutil::{MemoryLedger, MemoryStore, SubmitFailure};

    fn proposal() -> Proposal {
        Proposal::from_slice(br#"{"title":"T","description":"D","proposer":"P"}"#).unwrap()
    }

    #[tokio::test]
    async fn test_anchor_produces_consistent_record() {
        let store = MemoryStore::new();
        let ledger = MemoryLedger::new();

        let record = anchor_proposal(&proposal(), &store, &ledger).await.unwrap();

        assert_eq!(store.put_count(), 1);
        let metadata = ledger.metadata_for(&record.transaction_id).unwrap();
        assert_eq!(metadata.fingerprint, record.fingerprint.to_hex());
        assert_eq!(metadata.storage_locator, record.storage_locator);
        assert_eq!(metadata.storage, "memory");
        assert_eq!(metadata.kind, PAYLOAD_KIND);
    }

    #[tokio::test]
    async fn test_anchor_is_key_order_independent() {
        let store = MemoryStore::new();
        let ledger = MemoryLedger::new();

        let a = Proposal::from_slice(br#"{"title":"T","description":"D","proposer":"P"}"#)
            .unwrap();
        let b = Proposal::from_slice(br#"{"proposer":"P","title":"T","description":"D"}"#)
            .unwrap();

        let ra = anchor_proposal(&a, &store, &ledger).await.unwrap();
        let rb = anchor_proposal(&b, &store, &ledger).await.unwrap();
        assert_eq!(ra.fingerprint, rb.fingerprint);
    }

    #[tokio::test]
    async fn test_oversized_payload_fails_before_store_write() {
        let store = MemoryStore::new();
        let ledger = MemoryLedger::with_max_payload_bytes(64);

        let err = anchor_proposal(&proposal(), &store, &ledger)
            .await
            .unwrap_err();

        assert!(matches!(err, AnchorError::PayloadTooLarge { .. }));
        assert_eq!(store.put_count(), 0, "no orphan for a doomed anchor");
        assert_eq!(ledger.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_submission_leaves_orphan() {
        let store = MemoryStore::new();
        let ledger = MemoryLedger::new();
        ledger.set_submit_failure(Some(SubmitFailure::InsufficientFunds));

        let err = anchor_proposal(&proposal(), &store, &ledger)
            .await
            .unwrap_err();

        assert!(matches!(err, AnchorError::InsufficientFunds(_)));
        // The off-chain copy exists but nothing on the ledger points at it.
        assert_eq!(store.object_count(), 1);
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_after_failure_produces_new_locator() {
        let store = MemoryStore::new();
        let ledger = MemoryLedger::new();

        ledger.set_submit_failure(Some(SubmitFailure::Unavailable));
        assert!(anchor_proposal(&proposal(), &store, &ledger).await.is_err());

        ledger.set_submit_failure(None);
        let record = anchor_proposal(&proposal(), &store, &ledger).await.unwrap();

        // Two store objects: the orphan and the referenced copy.
        assert_eq!(store.object_count(), 2);
        assert!(ledger.metadata_for(&record.transaction_id).is_some());
    }
}
