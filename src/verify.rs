//! Verification pipeline: ledger lookup, content retrieval, fingerprint
//! recomputation.
//!
//! The mirror image of the anchor flow: fetch the recorded metadata by
//! transaction id, download the document from the content store,
//! re-canonicalize it with the identical rule used at anchor time, and
//! recompute the fingerprint. The recorded hash is never trusted on its
//! own — the comparison is always against an independent recomputation.
//!
//! A mismatch is a normal negative outcome (`matched = false`), never an
//! error. Only infrastructure faults surface as errors.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AnchorError, Result};
use crate::fingerprint::Fingerprint;
use crate::ledger::LedgerClient;
use crate::proposal::Proposal;
use crate::storage::ContentStore;

/// Outcome of one verification round trip. Never persisted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// The transaction id that was checked.
    pub transaction_id: String,
    /// Whether the recovered fingerprint matches the recorded one.
    pub matched: bool,
    /// Fingerprint recorded on the ledger.
    pub recorded_fingerprint: Option<Fingerprint>,
    /// Fingerprint recomputed from the retrieved document. Absent when
    /// the retrieved bytes are not a well-formed document.
    pub recovered_fingerprint: Option<Fingerprint>,
    /// The recovered document, when well-formed.
    pub proposal: Option<Proposal>,
    /// Note attached to a negative outcome (e.g., retrieved content could
    /// not be parsed), or the failure message when this result reports an
    /// infrastructure error in CLI output.
    pub error: Option<String>,
}

impl VerificationResult {
    /// Result shell for reporting an infrastructure failure in the CLI's
    /// JSON output; the library itself returns such failures as `Err`.
    pub fn failure(transaction_id: &str, error: &AnchorError) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            matched: false,
            recorded_fingerprint: None,
            recovered_fingerprint: None,
            proposal: None,
            error: Some(error.to_string()),
        }
    }
}

/// Verify a previously anchored proposal.
pub async fn verify_anchor(
    transaction_id: &str,
    store: &dyn ContentStore,
    ledger: &dyn LedgerClient,
) -> Result<VerificationResult> {
    let metadata = ledger.lookup(transaction_id).await?;
    let recorded = Fingerprint::from_hex(&metadata.fingerprint)?;
    info!(
        tx_id = %transaction_id,
        recorded = %recorded,
        locator = %metadata.storage_locator,
        "Ledger metadata retrieved"
    );

    let raw = store.get(&metadata.storage_locator).await?;

    let proposal = match Proposal::from_slice(&raw) {
        Ok(proposal) => proposal,
        Err(e) => {
            // The stored bytes no longer form a document at all. That is
            // a tamper signal, not an infrastructure fault.
            warn!(
                tx_id = %transaction_id,
                error = %e,
                "Retrieved content is not a well-formed document"
            );
            return Ok(VerificationResult {
                transaction_id: transaction_id.to_string(),
                matched: false,
                recorded_fingerprint: Some(recorded),
                recovered_fingerprint: None,
                proposal: None,
                error: Some(format!(
                    "retrieved content is not a well-formed document: {e}"
                )),
            });
        }
    };

    let recovered = Fingerprint::compute(&proposal.canonical_bytes());
    let matched = recovered == recorded;
    if matched {
        info!(tx_id = %transaction_id, fingerprint = %recovered, "Fingerprints match");
    } else {
        warn!(
            tx_id = %transaction_id,
            recorded = %recorded,
            recovered = %recovered,
            "Fingerprint mismatch"
        );
    }

    Ok(VerificationResult {
        transaction_id: transaction_id.to_string(),
        matched,
        recorded_fingerprint: Some(recorded),
        recovered_fingerprint: Some(recovered),
        proposal: Some(proposal),
        error: None,
    })
}
