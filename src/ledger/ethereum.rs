//! Ethereum calldata ledger client.
//!
//! The labeled metadata payload rides as calldata in a legacy self-send
//! transaction. Calldata is stored permanently on-chain, cheap at these
//! sizes, and readable back through `eth_getTransactionByHash`, which
//! makes the chain a queryable metadata ledger without any contract.
//!
//! Uses raw JSON-RPC for maximum node compatibility; transaction signing
//! goes through the alloy local signer. Key custody is out of scope —
//! the private key is handed in as opaque configuration.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{decode_labeled, encode_labeled, AnchorMetadata, LedgerClient};
use crate::error::{AnchorError, Result};
use crate::retry::{with_backoff, RetryPolicy};

/// Configuration for the Ethereum ledger client.
#[derive(Debug, Clone)]
pub struct EthereumConfig {
    /// JSON-RPC endpoint (e.g., Infura, Alchemy, local node).
    pub rpc_url: String,
    /// Network name: "mainnet", "sepolia", "holesky".
    pub network: String,
    /// Chain ID (1 for mainnet, 11155111 for Sepolia).
    pub chain_id: u64,
    /// Private key (hex, without 0x prefix) for signing transactions.
    /// In production, this would come from a KMS.
    pub private_key_hex: String,
    /// Numeric label keying the payload inside calldata.
    pub metadata_label: u64,
    /// Ceiling for the serialized labeled payload.
    pub max_payload_bytes: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for transient transport faults.
    pub retry: RetryPolicy,
}

/// Ethereum ledger client.
pub struct EthereumLedger {
    client: Client,
    config: EthereumConfig,
}

/// Simplified JSON-RPC response.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

/// Transaction fields needed for payload recovery.
#[derive(Debug, Deserialize)]
struct RpcTransaction {
    input: String,
}

/// Receipt fields needed for confirmation.
#[derive(Debug, Deserialize)]
struct RpcReceipt {
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
}

impl EthereumLedger {
    pub fn new(config: EthereumConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnchorError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Send a JSON-RPC request. A null result is `Ok(None)`; transport
    /// faults map through `fault`. Node errors are classified: an
    /// insufficient-funds message is a resource error, any other
    /// rejection of a submitted transaction is permanent.
    async fn rpc_call_opt<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
        fault: fn(String) -> AnchorError,
    ) -> Result<Option<T>> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp: JsonRpcResponse<T> = self
            .client
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| fault(format!("{method}: {e}")))?
            .json()
            .await
            .map_err(|e| fault(format!("{method}: invalid RPC response: {e}")))?;

        if let Some(err) = resp.error {
            let lower = err.message.to_ascii_lowercase();
            if lower.contains("insufficient funds") {
                return Err(AnchorError::InsufficientFunds(err.message));
            }
            if method == "eth_sendRawTransaction" {
                return Err(AnchorError::LedgerRejected(err.message));
            }
            return Err(fault(format!("{method}: {}", err.message)));
        }

        Ok(resp.result)
    }

    /// Like [`Self::rpc_call_opt`] for methods where a null result is a
    /// fault rather than an answer.
    async fn rpc_call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
        fault: fn(String) -> AnchorError,
    ) -> Result<T> {
        self.rpc_call_opt(method, params, fault)
            .await?
            .ok_or_else(|| fault(format!("{method}: empty RPC response")))
    }

    /// Build, sign, and send a transaction with the payload as calldata.
    async fn submit_once(&self, calldata: &[u8]) -> Result<String> {
        use alloy::consensus::SignableTransaction;
        use alloy::primitives::{Bytes, TxKind, U256};
        use alloy::signers::local::PrivateKeySigner;
        use alloy::signers::Signer;

        let signer: PrivateKeySigner = self
            .config
            .private_key_hex
            .parse()
            .map_err(|e| AnchorError::Config(format!("invalid ledger private key: {e}")))?;
        let from_address = signer.address();

        // Nonce sequencing belongs to the ledger; "pending" picks up any
        // in-flight transactions from this identity.
        let nonce_hex: String = self
            .rpc_call(
                "eth_getTransactionCount",
                serde_json::json!([format!("{from_address:?}"), "pending"]),
                AnchorError::LedgerSubmissionFailed,
            )
            .await?;
        let nonce = u64::from_str_radix(nonce_hex.trim_start_matches("0x"), 16)
            .map_err(|e| AnchorError::LedgerSubmissionFailed(format!("invalid nonce: {e}")))?;

        let gas_price_hex: String = self
            .rpc_call(
                "eth_gasPrice",
                serde_json::json!([]),
                AnchorError::LedgerSubmissionFailed,
            )
            .await?;
        let gas_price = u128::from_str_radix(gas_price_hex.trim_start_matches("0x"), 16)
            .map_err(|e| {
                AnchorError::LedgerSubmissionFailed(format!("invalid gas price: {e}"))
            })?;

        // 21k base + worst-case 16 gas per calldata byte, plus headroom.
        let gas_limit = 21_000 + (calldata.len() as u64) * 16 + 4_000;

        let tx = alloy::consensus::TxLegacy {
            chain_id: Some(self.config.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(from_address),
            value: U256::ZERO,
            input: Bytes::copy_from_slice(calldata),
        };

        let sig_hash = tx.signature_hash();
        let sig = signer
            .sign_hash(&sig_hash)
            .await
            .map_err(|e| AnchorError::LedgerSubmissionFailed(format!("signing failed: {e}")))?;

        let signed = alloy::consensus::TxEnvelope::Legacy(tx.into_signed(sig));
        let mut raw_tx = Vec::new();
        alloy::eips::eip2718::Encodable2718::encode_2718(&signed, &mut raw_tx);
        let raw_hex = format!("0x{}", hex::encode(&raw_tx));

        self.rpc_call(
            "eth_sendRawTransaction",
            serde_json::json!([raw_hex]),
            AnchorError::LedgerSubmissionFailed,
        )
        .await
    }

    async fn lookup_once(&self, tx_id: &str) -> Result<AnchorMetadata> {
        let tx: Option<RpcTransaction> = self
            .rpc_call_opt(
                "eth_getTransactionByHash",
                serde_json::json!([tx_id]),
                AnchorError::LedgerLookupFailed,
            )
            .await?;
        let tx = tx.ok_or_else(|| AnchorError::TransactionNotFound(tx_id.to_string()))?;

        let input = tx.input.trim_start_matches("0x");
        if input.is_empty() {
            return Err(AnchorError::MalformedMetadata(
                "transaction carries no payload".into(),
            ));
        }
        let calldata = hex::decode(input)
            .map_err(|e| AnchorError::MalformedMetadata(format!("calldata is not hex: {e}")))?;

        decode_labeled(self.config.metadata_label, &calldata)
    }

    async fn confirmation_once(&self, tx_id: &str) -> Result<Option<u64>> {
        let receipt: Option<RpcReceipt> = self
            .rpc_call_opt(
                "eth_getTransactionReceipt",
                serde_json::json!([tx_id]),
                AnchorError::LedgerLookupFailed,
            )
            .await?;

        match receipt.and_then(|r| r.block_number) {
            Some(hex) => {
                let block = u64::from_str_radix(hex.trim_start_matches("0x"), 16)
                    .map_err(|e| {
                        AnchorError::LedgerLookupFailed(format!("invalid block number: {e}"))
                    })?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LedgerClient for EthereumLedger {
    fn name(&self) -> &str {
        "ethereum"
    }

    fn check_payload(&self, payload: &AnchorMetadata) -> Result<()> {
        let encoded = encode_labeled(self.config.metadata_label, payload)?;
        if encoded.len() > self.config.max_payload_bytes {
            return Err(AnchorError::PayloadTooLarge {
                size: encoded.len(),
                limit: self.config.max_payload_bytes,
            });
        }
        Ok(())
    }

    async fn submit(&self, payload: &AnchorMetadata) -> Result<String> {
        self.check_payload(payload)?;
        let calldata = encode_labeled(self.config.metadata_label, payload)?;
        debug!(
            bytes = calldata.len(),
            label = self.config.metadata_label,
            network = %self.config.network,
            "Submitting anchor transaction"
        );
        with_backoff(&self.config.retry, "ledger submit", || {
            self.submit_once(&calldata)
        })
        .await
    }

    async fn lookup(&self, tx_id: &str) -> Result<AnchorMetadata> {
        with_backoff(&self.config.retry, "ledger lookup", || {
            self.lookup_once(tx_id)
        })
        .await
    }

    async fn confirmation(&self, tx_id: &str) -> Result<Option<u64>> {
        with_backoff(&self.config.retry, "ledger confirmation", || {
            self.confirmation_once(tx_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::PAYLOAD_KIND;

    fn test_ledger(max_payload_bytes: usize) -> EthereumLedger {
        EthereumLedger::new(EthereumConfig {
            rpc_url: "http://localhost:8545".into(),
            network: "sepolia".into(),
            chain_id: 11155111,
            private_key_hex: "0".repeat(64),
            metadata_label: 1337,
            max_payload_bytes,
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::none(),
        })
        .unwrap()
    }

    fn payload(locator: &str) -> AnchorMetadata {
        AnchorMetadata {
            fingerprint: "ab".repeat(32),
            storage_locator: locator.into(),
            storage: "arweave".into(),
            anchored_at: 1_722_000_000,
            kind: PAYLOAD_KIND.into(),
        }
    }

    #[test]
    fn test_check_payload_within_ceiling() {
        let ledger = test_ledger(16 * 1024);
        assert!(ledger.check_payload(&payload("arweave-tx-id")).is_ok());
    }

    #[test]
    fn test_check_payload_over_ceiling() {
        let ledger = test_ledger(64);
        let err = ledger.check_payload(&payload("arweave-tx-id")).unwrap_err();
        match err {
            AnchorError::PayloadTooLarge { size, limit } => {
                assert!(size > limit);
                assert_eq!(limit, 64);
            }
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }
}
