//! EVM source chain over an alloy HTTP provider.

use alloy::{
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{Filter, Header, Log},
};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use compass_primitives::{LogRecord, ReceiptRecord};

use crate::{
    connection::Connection,
    error::{ChainError, Result},
};

pub struct EvmConnection {
    name: String,
    provider: DynProvider,
}

impl EvmConnection {
    pub fn connect(name: impl Into<String>, rpc_url: &str) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid rpc url: {e}")))?;
        Ok(Self {
            name: name.into(),
            provider: ProviderBuilder::new().connect_http(url).erased(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn parse_log(log: Log) -> Result<LogRecord> {
        let block_number = log
            .block_number
            .ok_or_else(|| ChainError::Decode("log without a block number".into()))?;
        let tx_hash = log
            .transaction_hash
            .ok_or_else(|| ChainError::Decode("log without a transaction hash".into()))?;
        let log_index = log
            .log_index
            .ok_or_else(|| ChainError::Decode("log without a log index".into()))?;
        Ok(LogRecord {
            block_number: U256::from(block_number),
            tx_hash,
            log_index,
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
        })
    }
}

/// Heights are carried as big integers in the engine; the JSON-RPC
/// boundary is 64-bit.
fn rpc_height(height: U256) -> Result<u64> {
    u64::try_from(height)
        .map_err(|_| ChainError::Decode(format!("height {height} exceeds the rpc range")))
}

#[async_trait]
impl Connection for EvmConnection {
    async fn latest_block(&self) -> Result<U256> {
        let number = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(U256::from(number))
    }

    async fn filter_logs(
        &self,
        from: U256,
        to: U256,
        contract: Address,
        topics: &[B256],
    ) -> Result<Vec<LogRecord>> {
        let filter = Filter::new()
            .address(contract)
            .event_signature(topics.to_vec())
            .from_block(rpc_height(from)?)
            .to_block(rpc_height(to)?);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        logs.into_iter().map(Self::parse_log).collect()
    }

    async fn header_by_number(&self, number: U256) -> Result<Header> {
        let height = rpc_height(number)?;
        let block = self
            .provider
            .get_block_by_number(height.into())
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .ok_or_else(|| ChainError::Rpc(format!("no block at height {number}")))?;
        Ok(block.header)
    }

    async fn block_tx_hashes(&self, number: U256) -> Result<Vec<B256>> {
        let height = rpc_height(number)?;
        let block = self
            .provider
            .get_block_by_number(height.into())
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .ok_or_else(|| ChainError::Rpc(format!("no block at height {number}")))?;
        Ok(block.transactions.hashes().collect())
    }

    async fn receipts(&self, hashes: &[B256]) -> Result<Vec<ReceiptRecord>> {
        let mut records = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let receipt = self
                .provider
                .get_transaction_receipt(*hash)
                .await
                .map_err(|e| ChainError::Rpc(e.to_string()))?
                .ok_or_else(|| ChainError::Rpc(format!("no receipt for transaction {hash}")))?;
            // EIP-2718 typed encoding, the receipt trie leaf value.
            let envelope = receipt.inner.map_logs(|log| log.inner);
            records.push(ReceiptRecord {
                tx_hash: *hash,
                encoded: envelope.encoded_2718().into(),
            });
        }
        Ok(records)
    }
}

impl std::fmt::Debug for EvmConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmConnection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
