//! Mapping from event signature topics to destination-side methods.

use std::collections::HashMap;

use alloy_primitives::{B256, keccak256};
use serde::{Deserialize, Serialize};

/// The destination MCS methods a source event can be delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Method {
    TransferIn,
    SwapIn,
    DepositIn,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TransferIn => "transferIn",
            Self::SwapIn => "swapIn",
            Self::DepositIn => "depositIn",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Topic-hash lookup table, built once at startup from the configured
/// event signatures. Unknown topics are skipped by the caller, never
/// errored.
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    by_topic: HashMap<B256, Method>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Method)>) -> Self {
        let mut registry = Self::new();
        for (signature, method) in pairs {
            registry.register(signature, method);
        }
        registry
    }

    /// Register an event signature (e.g.
    /// `mapTransferOut(bytes32,address,bytes,uint256,bytes)`), returning
    /// its topic hash.
    pub fn register(&mut self, signature: &str, method: Method) -> B256 {
        let topic = keccak256(signature.as_bytes());
        self.by_topic.insert(topic, method);
        topic
    }

    pub fn resolve(&self, topic0: B256) -> Option<Method> {
        self.by_topic.get(&topic0).copied()
    }

    /// The topic set to filter source logs with.
    pub fn topics(&self) -> Vec<B256> {
        self.by_topic.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_topic.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_topic_resolves() {
        let mut registry = MethodRegistry::new();
        let topic = registry.register("mapTransferOut(bytes32,address,bytes)", Method::TransferIn);
        assert_eq!(registry.resolve(topic), Some(Method::TransferIn));
        assert_eq!(registry.topics(), vec![topic]);
    }

    #[test]
    fn unknown_topic_is_none() {
        let registry =
            MethodRegistry::from_pairs([("mapSwapOut(bytes32,address,bytes)", Method::SwapIn)]);
        assert_eq!(registry.resolve(B256::ZERO), None);
    }
}
