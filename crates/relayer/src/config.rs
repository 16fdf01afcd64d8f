//! Relayer configuration.
//!
//! The CLI hands the engine a parsed `Config`; everything here is plain
//! data. Addresses stay as strings until the owning component parses
//! them, so one bad chain section fails at spawn with a precise error.

use std::{path::{Path, PathBuf}, time::Duration};

use alloy_primitives::U256;
use compass_chain::{Method, MethodRegistry};
use compass_primitives::{ChainId, interval::MIN_MAP_CONFIRMATIONS};
use eyre::WrapErr;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub map: MapConfig,
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("compass-checkpoints.json")
}

impl Config {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read config file {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .wrap_err_with(|| format!("cannot parse config file {}", path.display()))?;
        for chain in &config.chains {
            if chain.sync_to_map && chain.events.is_empty() {
                tracing::warn!(
                    chain = %chain.name,
                    "no events configured; the messenger will emit nothing"
                );
            }
        }
        Ok(config)
    }
}

/// The destination Map chain.
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    pub chain_id: ChainId,
    pub rpc_url: String,
    /// Light-node registry contract, queried for verify ranges, anchored
    /// heights and relayer status.
    pub lightnode: String,
    /// MCS contract receiving `SwapWithProof` submissions.
    pub mcs: String,
    /// Submitter key; without one, submissions are only simulated.
    pub private_key: Option<String>,
    /// Relayer account for status queries when no key is configured.
    pub relayer_account: Option<String>,
    #[serde(default = "default_block_interval_secs")]
    pub block_interval_secs: u64,
}

fn default_block_interval_secs() -> u64 {
    5
}

impl MapConfig {
    pub fn block_interval(&self) -> Duration {
        Duration::from_secs(self.block_interval_secs)
    }
}

/// One observed source chain.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: ChainId,
    pub rpc_url: String,
    /// MCS contract whose events are relayed.
    pub mcs_contract: String,
    #[serde(default)]
    pub events: Vec<EventMapping>,
    /// First height to process when no checkpoint exists.
    #[serde(default)]
    pub start_block: u64,
    #[serde(default = "default_block_confirmations")]
    pub block_confirmations: u64,
    #[serde(default)]
    pub sync_to_map: bool,
    /// Light-client epoch length; set only on epoch-based chains.
    pub epoch_size: Option<u64>,
    /// Headers included in a proof bundle.
    #[serde(default = "default_proof_confirm_depth")]
    pub proof_confirm_depth: u64,
}

fn default_block_confirmations() -> u64 {
    10
}

fn default_proof_confirm_depth() -> u64 {
    10
}

impl ChainConfig {
    /// Confirmation depth actually enforced. Relaying to the Map chain
    /// requires at least [`MIN_MAP_CONFIRMATIONS`], whatever is
    /// configured.
    pub fn effective_confirmations(&self) -> U256 {
        let confirmations = if self.sync_to_map {
            self.block_confirmations.max(MIN_MAP_CONFIRMATIONS)
        } else {
            self.block_confirmations
        };
        U256::from(confirmations)
    }

    pub fn method_registry(&self) -> MethodRegistry {
        MethodRegistry::from_pairs(
            self.events
                .iter()
                .map(|event| (event.signature.as_str(), event.method)),
        )
    }
}

/// A relayed event: its source signature and the destination method it is
/// delivered through.
#[derive(Debug, Clone, Deserialize)]
pub struct EventMapping {
    pub signature: String,
    pub method: Method,
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn chain_config(block_confirmations: u64, sync_to_map: bool) -> ChainConfig {
        ChainConfig {
            name: "matic".into(),
            chain_id: 137,
            rpc_url: "http://localhost:8545".into(),
            mcs_contract: "0x0000000000000000000000000000000000000001".into(),
            events: Vec::new(),
            start_block: 0,
            block_confirmations,
            sync_to_map,
            epoch_size: None,
            proof_confirm_depth: 10,
        }
    }

    // Relaying to the Map chain needs at least 20 confirmations.
    #[test_case(5, true, 20)]
    #[test_case(20, true, 20)]
    #[test_case(64, true, 64)]
    #[test_case(5, false, 5)]
    fn effective_confirmations(configured: u64, sync_to_map: bool, expected: u64) {
        let config = chain_config(configured, sync_to_map);
        assert_eq!(config.effective_confirmations(), U256::from(expected));
    }

    #[test]
    fn parses_a_full_config() {
        let raw = r#"
            checkpoint_path = "/tmp/compass.json"

            [map]
            chain_id = 212
            rpc_url = "http://map:8545"
            lightnode = "0x0000000000000000000000000000000000000010"
            mcs = "0x0000000000000000000000000000000000000011"

            [[chains]]
            name = "matic"
            chain_id = 137
            rpc_url = "http://matic:8545"
            mcs_contract = "0x0000000000000000000000000000000000000012"
            start_block = 100
            block_confirmations = 10
            sync_to_map = true
            proof_confirm_depth = 10

            [[chains.events]]
            signature = "mapTransferOut(bytes32,address,bytes)"
            method = "transferIn"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.map.chain_id, 212);
        assert_eq!(config.chains.len(), 1);
        let chain = &config.chains[0];
        assert_eq!(chain.effective_confirmations(), U256::from(20u64));
        assert!(!chain.method_registry().is_empty());
        assert_eq!(chain.epoch_size, None);
    }
}
