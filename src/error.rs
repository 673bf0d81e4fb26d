use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnchorError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Metadata payload too large: {size} bytes exceeds ledger ceiling of {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Storage backend unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Stored content unavailable: {0}")]
    ContentUnavailable(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Ledger submission failed: {0}")]
    LedgerSubmissionFailed(String),

    #[error("Ledger rejected transaction: {0}")]
    LedgerRejected(String),

    #[error("Ledger lookup failed: {0}")]
    LedgerLookupFailed(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Malformed transaction metadata: {0}")]
    MalformedMetadata(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AnchorError {
    /// Whether a bounded retry with backoff is appropriate.
    ///
    /// Transport-level faults against the store or ledger are transient.
    /// Confirmed rejections (insufficient funds, malformed payloads, missing
    /// transactions) are permanent and must surface immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AnchorError::StoreUnavailable(_)
                | AnchorError::ContentUnavailable(_)
                | AnchorError::LedgerLookupFailed(_)
                | AnchorError::LedgerSubmissionFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AnchorError>;
