//! Read-side capability of a source chain.

use alloy::rpc::types::Header;
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use compass_primitives::{LightClientBlock, LogRecord, ReceiptRecord};

use crate::error::{ChainError, Result};

/// Everything the relayer reads from a source chain.
///
/// All methods are fallible and idempotent; per-call timeouts are the
/// transport's responsibility. Implementations are shared immutably
/// between the pollers of a chain.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Height of the chain tip.
    async fn latest_block(&self) -> Result<U256>;

    /// Logs emitted by `contract` in `[from, to]` whose first topic is in
    /// `topics`.
    async fn filter_logs(
        &self,
        from: U256,
        to: U256,
        contract: Address,
        topics: &[B256],
    ) -> Result<Vec<LogRecord>>;

    /// Header at the given height.
    async fn header_by_number(&self, number: U256) -> Result<Header>;

    /// Hashes of every transaction in the block, in execution order.
    async fn block_tx_hashes(&self, number: U256) -> Result<Vec<B256>>;

    /// Receipts for the given transactions, in their trie-leaf encoding,
    /// in the same order as `hashes`.
    async fn receipts(&self, hashes: &[B256]) -> Result<Vec<ReceiptRecord>>;

    /// The next light-client block following the block with `hash`.
    ///
    /// Only epoch-based chains provide this; the default refuses.
    async fn next_light_client_block(&self, _hash: B256) -> Result<LightClientBlock> {
        Err(ChainError::Unsupported("next_light_client_block"))
    }
}
