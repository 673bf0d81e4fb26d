//! Environment-driven configuration.
//!
//! Collaborator endpoints, credentials, the ledger network, and the
//! metadata label all come from the environment. The protocol core never
//! reads configuration itself — clients are constructed once from this
//! struct and passed in explicitly.

use std::env;
use std::time::Duration;

use crate::error::{AnchorError, Result};
use crate::ledger::ethereum::EthereumConfig;
use crate::retry::RetryPolicy;
use crate::storage::arweave::ArweaveConfig;
use crate::storage::ipfs::IpfsConfig;

/// Metadata label used when `METADATA_LABEL` is unset.
pub const DEFAULT_METADATA_LABEL: u64 = 1337;
/// Per-request timeout used when `ANCHOR_HTTP_TIMEOUT_SECS` is unset.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Ledger metadata ceiling used when `ANCHOR_MAX_PAYLOAD_BYTES` is unset.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 16 * 1024;

/// Which content-store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Arweave,
    Ipfs,
}

impl StoreKind {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "arweave" => Ok(StoreKind::Arweave),
            "ipfs" => Ok(StoreKind::Ipfs),
            other => Err(AnchorError::Config(format!(
                "unknown store backend {other:?} (expected \"arweave\" or \"ipfs\")"
            ))),
        }
    }
}

/// Chain id for a named network, unless overridden by `ANCHOR_CHAIN_ID`.
pub fn chain_id_for(network: &str) -> Result<u64> {
    match network {
        "mainnet" => Ok(1),
        "sepolia" => Ok(11_155_111),
        "holesky" => Ok(17_000),
        other => Err(AnchorError::Config(format!(
            "unknown network {other:?} (expected mainnet, sepolia, or holesky; \
             set ANCHOR_CHAIN_ID for anything else)"
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub network: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub private_key_hex: String,
    pub metadata_label: u64,
    pub max_payload_bytes: usize,
    pub store: StoreKind,
    pub arweave: ArweaveConfig,
    pub ipfs: IpfsConfig,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Config {
    /// Read configuration from the process environment. Every missing
    /// required variable is named in one error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok().filter(|v| !v.is_empty()))
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut missing: Vec<&str> = Vec::new();
        let mut require = |name: &'static str| -> String {
            match get(name) {
                Some(value) => value,
                None => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let rpc_url = require("ANCHOR_RPC_URL");
        let private_key_hex = require("ANCHOR_PRIVATE_KEY");

        let store = StoreKind::parse(
            &get("ANCHOR_STORE").unwrap_or_else(|| "arweave".to_string()),
        )?;
        let arweave_api_key = match store {
            StoreKind::Arweave => require("ARWEAVE_API_KEY"),
            StoreKind::Ipfs => get("ARWEAVE_API_KEY").unwrap_or_default(),
        };

        if !missing.is_empty() {
            return Err(AnchorError::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let network = get("ANCHOR_NETWORK").unwrap_or_else(|| "sepolia".to_string());
        let chain_id = match get("ANCHOR_CHAIN_ID") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AnchorError::Config(format!("invalid ANCHOR_CHAIN_ID: {e}")))?,
            None => chain_id_for(&network)?,
        };

        let metadata_label = match get("METADATA_LABEL") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AnchorError::Config(format!("invalid METADATA_LABEL: {e}")))?,
            None => DEFAULT_METADATA_LABEL,
        };

        let max_payload_bytes = match get("ANCHOR_MAX_PAYLOAD_BYTES") {
            Some(raw) => raw.parse().map_err(|e| {
                AnchorError::Config(format!("invalid ANCHOR_MAX_PAYLOAD_BYTES: {e}"))
            })?,
            None => DEFAULT_MAX_PAYLOAD_BYTES,
        };

        let timeout_secs = match get("ANCHOR_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|e| {
                AnchorError::Config(format!("invalid ANCHOR_HTTP_TIMEOUT_SECS: {e}"))
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        let http_timeout = Duration::from_secs(timeout_secs);
        let retry = RetryPolicy::default();

        let arweave = ArweaveConfig {
            gateway_url: get("ARWEAVE_GATEWAY_URL")
                .unwrap_or_else(|| "https://arweave.net".to_string()),
            bundler_url: get("ARWEAVE_BUNDLER_URL")
                .unwrap_or_else(|| "https://node1.irys.xyz".to_string()),
            api_key: arweave_api_key,
            timeout: http_timeout,
            retry: retry.clone(),
        };

        let ipfs = IpfsConfig {
            api_url: get("IPFS_API_URL").unwrap_or_else(|| "http://localhost:5001".to_string()),
            gateway_url: get("IPFS_GATEWAY_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            timeout: http_timeout,
            retry: retry.clone(),
        };

        Ok(Self {
            network,
            chain_id,
            rpc_url,
            private_key_hex,
            metadata_label,
            max_payload_bytes,
            store,
            arweave,
            ipfs,
            http_timeout,
            retry,
        })
    }

    /// Ledger-client configuration slice.
    pub fn ethereum(&self) -> EthereumConfig {
        EthereumConfig {
            rpc_url: self.rpc_url.clone(),
            network: self.network.clone(),
            chain_id: self.chain_id,
            private_key_hex: self.private_key_hex.clone(),
            metadata_label: self.metadata_label,
            max_payload_bytes: self.max_payload_bytes,
            timeout: self.http_timeout,
            retry: self.retry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + '_ {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |name| map.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_minimal_arweave_config() {
        let config = Config::from_lookup(lookup(&[
            ("ANCHOR_RPC_URL", "http://localhost:8545"),
            ("ANCHOR_PRIVATE_KEY", "aa"),
            ("ARWEAVE_API_KEY", "key"),
        ]))
        .unwrap();
        assert_eq!(config.network, "sepolia");
        assert_eq!(config.chain_id, 11_155_111);
        assert_eq!(config.metadata_label, DEFAULT_METADATA_LABEL);
        assert_eq!(config.store, StoreKind::Arweave);
        assert_eq!(config.max_payload_bytes, DEFAULT_MAX_PAYLOAD_BYTES);
    }

    #[test]
    fn test_missing_variables_are_named() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("ANCHOR_RPC_URL"), "{message}");
        assert!(message.contains("ANCHOR_PRIVATE_KEY"), "{message}");
        assert!(message.contains("ARWEAVE_API_KEY"), "{message}");
    }

    #[test]
    fn test_ipfs_backend_does_not_require_arweave_key() {
        let config = Config::from_lookup(lookup(&[
            ("ANCHOR_RPC_URL", "http://localhost:8545"),
            ("ANCHOR_PRIVATE_KEY", "aa"),
            ("ANCHOR_STORE", "ipfs"),
        ]))
        .unwrap();
        assert_eq!(config.store, StoreKind::Ipfs);
        assert_eq!(config.ipfs.api_url, "http://localhost:5001");
    }

    #[test]
    fn test_unknown_store_backend() {
        let err = Config::from_lookup(lookup(&[
            ("ANCHOR_RPC_URL", "http://localhost:8545"),
            ("ANCHOR_PRIVATE_KEY", "aa"),
            ("ANCHOR_STORE", "s3"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AnchorError::Config(_)));
    }

    #[test]
    fn test_network_selection() {
        assert_eq!(chain_id_for("mainnet").unwrap(), 1);
        assert_eq!(chain_id_for("sepolia").unwrap(), 11_155_111);
        assert_eq!(chain_id_for("holesky").unwrap(), 17_000);
        assert!(chain_id_for("testnet9000").is_err());
    }

    #[test]
    fn test_chain_id_override() {
        let config = Config::from_lookup(lookup(&[
            ("ANCHOR_RPC_URL", "http://localhost:8545"),
            ("ANCHOR_PRIVATE_KEY", "aa"),
            ("ARWEAVE_API_KEY", "key"),
            ("ANCHOR_NETWORK", "anvil"),
            ("ANCHOR_CHAIN_ID", "31337"),
            ("METADATA_LABEL", "7"),
        ]))
        .unwrap();
        assert_eq!(config.chain_id, 31_337);
        assert_eq!(config.metadata_label, 7);
    }
}
