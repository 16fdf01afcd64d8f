//! Source-chain records as the relayer engine sees them.
//!
//! The engine treats RPC responses as opaque byte payloads with typed
//! accessors; the chain-specific transport decodes into these records at
//! the capability boundary.

use alloy_primitives::{Address, B256, Bytes, U256};

use crate::OrderId;

/// A single matched log from a source-chain block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub block_number: U256,
    pub tx_hash: B256,
    pub log_index: u64,
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

impl LogRecord {
    /// The cross-chain order id: the first 32 bytes of the data payload.
    /// `None` when the payload is too short to carry one.
    pub fn order_id(&self) -> Option<OrderId> {
        (self.data.len() >= 32).then(|| B256::from_slice(&self.data[..32]))
    }

    /// The event signature topic, when present.
    pub fn topic0(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}

/// A transaction receipt in its chain-canonical trie-leaf encoding.
///
/// For EVM chains this is the EIP-2718 typed encoding, i.e. exactly the
/// value stored under the receipt trie leaf for the transaction's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptRecord {
    pub tx_hash: B256,
    pub encoded: Bytes,
}

/// The epoch-closing block that advances a destination light client,
/// already in the chain-specific canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightClientBlock {
    pub height: U256,
    pub hash: B256,
    pub encoded: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log(data: Vec<u8>) -> LogRecord {
        LogRecord {
            block_number: U256::from(100u64),
            tx_hash: B256::repeat_byte(0x11),
            log_index: 0,
            address: Address::repeat_byte(0x22),
            topics: vec![B256::repeat_byte(0x33)],
            data: data.into(),
        }
    }

    #[test]
    fn order_id_is_data_prefix() {
        let mut data = vec![0xAA; 32];
        data.extend_from_slice(&[0xBB; 8]);
        let log = sample_log(data);
        assert_eq!(log.order_id(), Some(B256::repeat_byte(0xAA)));
    }

    #[test]
    fn short_data_has_no_order_id() {
        let log = sample_log(vec![0xAA; 31]);
        assert_eq!(log.order_id(), None);
    }
}
