//! Read-side capability of the destination Map chain.

use std::time::Duration;

use alloy::{
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    sol,
    sol_types::SolCall,
};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use compass_primitives::{ChainId, RelayerStatus, VerifyRange};

use crate::error::{ChainError, Result};

sol! {
    function verifiableHeaderRange(uint64 chainId) external view returns (uint256 left, uint256 right);
    function headerHeight(uint64 chainId) external view returns (uint256 height);
    function relayerStatus(address account) external view returns (bool registered, bool active, uint256 periodStart, uint256 periodEnd);
}

/// Destination-chain queries the relayer gates on.
#[async_trait]
pub trait MapClient: Send + Sync {
    /// The source-height window the destination can currently verify for
    /// `chain`. Zero endpoints mean "unbounded on that side".
    async fn verify_range(&self, chain: ChainId) -> Result<VerifyRange>;

    /// The source height the destination's light client is anchored at.
    async fn anchored_height(&self, chain: ChainId) -> Result<U256>;

    /// Registration and rotation-window state of this relayer account.
    async fn relayer_status(&self) -> Result<RelayerStatus>;

    /// Destination tip height.
    async fn latest_block(&self) -> Result<U256>;

    /// Estimated destination block production interval, used to size
    /// rotation-horizon sleeps.
    fn block_interval(&self) -> Duration;
}

/// Map chain over an alloy HTTP provider, reading the light-node registry
/// contract.
pub struct EvmMapClient {
    provider: DynProvider,
    lightnode: Address,
    account: Address,
    block_interval: Duration,
}

impl EvmMapClient {
    pub fn connect(
        rpc_url: &str,
        lightnode: Address,
        account: Address,
        block_interval: Duration,
    ) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid rpc url: {e}")))?;
        Ok(Self {
            provider: ProviderBuilder::new().connect_http(url).erased(),
            lightnode,
            account,
            block_interval,
        })
    }

    async fn view_call(&self, input: Vec<u8>) -> Result<alloy_primitives::Bytes> {
        let tx = TransactionRequest::default()
            .to(self.lightnode)
            .input(input.into());
        self.provider
            .call(tx)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }
}

#[async_trait]
impl MapClient for EvmMapClient {
    async fn verify_range(&self, chain: ChainId) -> Result<VerifyRange> {
        let call = verifiableHeaderRangeCall { chainId: chain };
        let data = self.view_call(call.abi_encode()).await?;
        let range = verifiableHeaderRangeCall::abi_decode_returns(&data)
            .map_err(|e| ChainError::Decode(e.to_string()))?;
        Ok(VerifyRange::new(range.left, range.right))
    }

    async fn anchored_height(&self, chain: ChainId) -> Result<U256> {
        let call = headerHeightCall { chainId: chain };
        let data = self.view_call(call.abi_encode()).await?;
        headerHeightCall::abi_decode_returns(&data).map_err(|e| ChainError::Decode(e.to_string()))
    }

    async fn relayer_status(&self) -> Result<RelayerStatus> {
        let call = relayerStatusCall {
            account: self.account,
        };
        let data = self.view_call(call.abi_encode()).await?;
        let status = relayerStatusCall::abi_decode_returns(&data)
            .map_err(|e| ChainError::Decode(e.to_string()))?;
        Ok(RelayerStatus {
            registered: status.registered,
            active_relayer: status.active,
            period_start: status.periodStart,
            period_end: status.periodEnd,
        })
    }

    async fn latest_block(&self) -> Result<U256> {
        let number = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(U256::from(number))
    }

    fn block_interval(&self) -> Duration {
        self.block_interval
    }
}

impl std::fmt::Debug for EvmMapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmMapClient")
            .field("lightnode", &self.lightnode)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}
