//! Event inclusion proof assembly.
//!
//! A proof bundle lets the destination verifier reconstruct the source
//! block's receipt trie, check the event's receipt against the header's
//! receipts root, and replay the log at its index.

use alloy::{rpc::types::Header, sol, sol_types::SolValue};
use alloy_primitives::{B256, Bytes};
use alloy_trie::{HashBuilder, Nibbles, proof::ProofRetainer};
use compass_primitives::{ChainId, LogRecord, ReceiptRecord};

use crate::{
    error::{ChainError, Result},
    method::Method,
};

sol! {
    /// ABI layout of an assembled proof, as the destination verifier
    /// consumes it.
    struct ReceiptProofBundle {
        uint64 chainId;
        bytes[] headers;
        bytes[] proof;
        bytes receipt;
        bytes key;
        uint64 logIndex;
        string method;
    }
}

/// Chain-specific proof encoding. One implementation per source chain
/// family; each converts headers to the destination-facing form and packs
/// the bundle the verifier contract expects.
pub trait ProofAssembler: Send + Sync {
    /// Assemble the proof for `log`, given the `K` consecutive headers
    /// starting at the event's block and every receipt of that block in
    /// execution order.
    fn assemble(
        &self,
        chain: ChainId,
        headers: &[Header],
        receipts: &[ReceiptRecord],
        log: &LogRecord,
        method: Method,
    ) -> Result<Bytes>;
}

/// Proof assembly for EVM source chains: a Merkle-Patricia inclusion
/// proof of the event's receipt, plus the RLP headers covering the
/// confirmation window.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvmProofAssembler;

impl ProofAssembler for EvmProofAssembler {
    fn assemble(
        &self,
        chain: ChainId,
        headers: &[Header],
        receipts: &[ReceiptRecord],
        log: &LogRecord,
        method: Method,
    ) -> Result<Bytes> {
        let event_header = headers
            .first()
            .ok_or_else(|| ChainError::Decode("proof bundle without headers".into()))?;

        let tx_index = receipts
            .iter()
            .position(|receipt| receipt.tx_hash == log.tx_hash)
            .ok_or_else(|| {
                ChainError::Decode(format!(
                    "transaction {} not found in block {} receipts",
                    log.tx_hash, log.block_number
                ))
            })?;

        let encoded: Vec<Vec<u8>> = receipts
            .iter()
            .map(|receipt| receipt.encoded.to_vec())
            .collect();
        let (root, proof) = receipt_proof(&encoded, tx_index)?;

        if root != event_header.inner.receipts_root {
            return Err(ChainError::Decode(format!(
                "receipts root mismatch at block {}: computed {root}, header has {}",
                log.block_number, event_header.inner.receipts_root
            )));
        }

        let headers_rlp: Vec<Bytes> = headers
            .iter()
            .map(|header| alloy_rlp::encode(&header.inner).into())
            .collect();

        let bundle = ReceiptProofBundle {
            chainId: chain,
            headers: headers_rlp,
            proof: proof.into_iter().map(Bytes::from).collect(),
            receipt: receipts[tx_index].encoded.clone(),
            key: alloy_rlp::encode(tx_index).into(),
            logIndex: log.log_index,
            method: method.name().to_string(),
        };

        Ok(bundle.abi_encode().into())
    }
}

/// Build the block's receipt trie and extract the inclusion proof for the
/// receipt at `target_index`. Returns the trie root and the proof nodes.
pub fn receipt_proof(
    receipts_rlp: &[Vec<u8>],
    target_index: usize,
) -> Result<(B256, Vec<Vec<u8>>)> {
    if target_index >= receipts_rlp.len() {
        return Err(ChainError::Decode(format!(
            "receipt index {target_index} out of bounds (len={})",
            receipts_rlp.len()
        )));
    }

    // Trie keys are the RLP-encoded transaction indices.
    let mut pairs: Vec<(Nibbles, Vec<u8>)> = Vec::with_capacity(receipts_rlp.len());
    for (i, receipt_rlp) in receipts_rlp.iter().enumerate() {
        let key = alloy_rlp::encode(i);
        pairs.push((Nibbles::unpack(&key), receipt_rlp.clone()));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let target_key = alloy_rlp::encode(target_index);
    let target_nibbles = Nibbles::unpack(&target_key);
    let retainer = ProofRetainer::new(vec![target_nibbles]);

    let mut builder = HashBuilder::default().with_proof_retainer(retainer);
    for (nibbles, value) in &pairs {
        builder.add_leaf(nibbles.clone(), value);
    }
    let root = builder.root();

    let proof = builder
        .take_proof_nodes()
        .into_nodes_sorted()
        .into_iter()
        .map(|(_, node)| node.to_vec())
        .collect();

    Ok((root, proof))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, U256};
    use proptest::prelude::*;

    use super::*;

    fn sample_header(number: u64, receipts_root: B256) -> Header {
        let inner = alloy_consensus::Header {
            number,
            receipts_root,
            ..Default::default()
        };
        Header {
            hash: B256::repeat_byte(number as u8),
            inner,
            total_difficulty: None,
            size: None,
        }
    }

    fn sample_receipts(payloads: &[&[u8]]) -> Vec<ReceiptRecord> {
        payloads
            .iter()
            .enumerate()
            .map(|(i, payload)| ReceiptRecord {
                tx_hash: B256::repeat_byte(0x40 + i as u8),
                encoded: Bytes::copy_from_slice(payload),
            })
            .collect()
    }

    #[test]
    fn rlp_index_keys() {
        // Index 0 encodes as the empty string, 0x80.
        assert_eq!(alloy_rlp::encode(0usize), vec![0x80]);
        assert_eq!(alloy_rlp::encode(1usize), vec![0x01]);
        assert_eq!(alloy_rlp::encode(127usize), vec![0x7f]);
        assert_eq!(alloy_rlp::encode(128usize), vec![0x81, 0x80]);
    }

    #[test]
    fn proof_for_each_index_shares_the_root() {
        let receipts: Vec<Vec<u8>> = vec![
            vec![0x01, 0x02, 0x03],
            vec![0x04, 0x05, 0x06],
            vec![0x07, 0x08, 0x09],
        ];
        let (root, _) = receipt_proof(&receipts, 0).unwrap();
        for i in 0..receipts.len() {
            let (other, proof) = receipt_proof(&receipts, i).unwrap();
            assert_eq!(other, root);
            assert!(!proof.is_empty());
        }
        assert_ne!(root, B256::ZERO);
    }

    #[test]
    fn out_of_bounds_index_is_an_error() {
        let receipts = vec![vec![0x01]];
        assert!(receipt_proof(&receipts, 1).is_err());
    }

    #[test]
    fn assemble_rejects_receipts_root_mismatch() {
        let receipts = sample_receipts(&[b"receipt-0"]);
        let header = sample_header(100, B256::repeat_byte(0xEE));
        let log = LogRecord {
            block_number: U256::from(100u64),
            tx_hash: receipts[0].tx_hash,
            log_index: 0,
            address: Address::ZERO,
            topics: vec![B256::ZERO],
            data: Bytes::from(vec![0xAA; 32]),
        };
        let err = EvmProofAssembler
            .assemble(1, &[header], &receipts, &log, Method::TransferIn)
            .unwrap_err();
        assert!(err.to_string().contains("receipts root mismatch"));
    }

    #[test]
    fn assemble_packs_the_bundle() {
        let receipts = sample_receipts(&[b"receipt-0", b"receipt-1"]);
        let encoded: Vec<Vec<u8>> = receipts.iter().map(|r| r.encoded.to_vec()).collect();
        let (root, _) = receipt_proof(&encoded, 1).unwrap();

        let header = sample_header(100, root);
        let log = LogRecord {
            block_number: U256::from(100u64),
            tx_hash: receipts[1].tx_hash,
            log_index: 3,
            address: Address::ZERO,
            topics: vec![B256::ZERO],
            data: Bytes::from(vec![0xAA; 32]),
        };

        let proof = EvmProofAssembler
            .assemble(7, &[header], &receipts, &log, Method::SwapIn)
            .unwrap();
        assert!(!proof.is_empty());
    }

    proptest! {
        #[test]
        fn receipt_proof_is_total_over_nonempty_blocks(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 1..20),
            index_seed in any::<usize>(),
        ) {
            let index = index_seed % payloads.len();
            let (root, proof) = receipt_proof(&payloads, index).unwrap();
            prop_assert_ne!(root, B256::ZERO);
            prop_assert!(!proof.is_empty());
            // Every index of the same block agrees on the root.
            let (other_root, _) = receipt_proof(&payloads, 0).unwrap();
            prop_assert_eq!(root, other_root);
        }
    }
}
