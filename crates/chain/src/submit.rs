//! Write-side capability of the destination Map chain.

use alloy::{
    network::EthereumWallet,
    providers::{DynProvider, Provider, ProviderBuilder, WalletProvider},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol,
    sol_types::SolCall,
};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use compass_primitives::{ChainId, MessageBody, SwapWithProof, SyncToMap};
use thiserror::Error;

use crate::error::ChainError;

sol! {
    function swapIn(bytes proof, bytes32 orderId, uint64 srcHeight, bytes32 srcTxHash);
    function updateBlockHeader(uint64 srcChainId, bytes lightClientBlock);
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Worth retrying with back-off.
    #[error("transient submission failure: {0}")]
    Transient(String),

    /// The destination refused the submission; retrying cannot help.
    #[error("submission rejected: {0}")]
    Rejected(String),
}

/// Submits messages to the destination chain and waits for on-chain
/// confirmation. One submitter per destination account; the router
/// serialises calls, so nonces stay sequential.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, src: ChainId, body: &MessageBody) -> Result<B256, SubmitError>;
}

/// Map-chain submitter over an alloy HTTP provider.
///
/// Without a signer, submissions are only simulated via `eth_call`; this
/// mirrors a dry-run deployment where the relayer account is not yet
/// funded.
pub struct EvmSubmitter {
    provider: DynProvider,
    mcs: Address,
    lightnode: Address,
    account: Option<Address>,
}

impl EvmSubmitter {
    pub fn connect(rpc_url: &str, mcs: Address, lightnode: Address) -> Result<Self, ChainError> {
        let url = rpc_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid rpc url: {e}")))?;
        Ok(Self {
            provider: ProviderBuilder::new().connect_http(url).erased(),
            mcs,
            lightnode,
            account: None,
        })
    }

    pub fn connect_with_signer(
        rpc_url: &str,
        mcs: Address,
        lightnode: Address,
        private_key: &str,
    ) -> Result<Self, ChainError> {
        let url = rpc_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid rpc url: {e}")))?;
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| ChainError::Decode(format!("invalid private key: {e}")))?;
        let account = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);
        tracing::info!(from = %provider.default_signer_address(), "map submitter signer configured");
        Ok(Self {
            provider: provider.erased(),
            mcs,
            lightnode,
            account: Some(account),
        })
    }

    /// The signing account, when one is configured.
    pub fn account(&self) -> Option<Address> {
        self.account
    }

    fn request_for(&self, src: ChainId, body: &MessageBody) -> TransactionRequest {
        match body {
            MessageBody::SwapWithProof(SwapWithProof {
                order_id,
                block,
                tx_hash,
                proof,
            }) => {
                let call = swapInCall {
                    proof: proof.clone(),
                    orderId: *order_id,
                    srcHeight: u64::try_from(*block).unwrap_or(u64::MAX),
                    srcTxHash: *tx_hash,
                };
                TransactionRequest::default()
                    .to(self.mcs)
                    .input(call.abi_encode().into())
            }
            MessageBody::SyncToMap(SyncToMap { light_client_block }) => {
                let call = updateBlockHeaderCall {
                    srcChainId: src,
                    lightClientBlock: light_client_block.clone(),
                };
                TransactionRequest::default()
                    .to(self.lightnode)
                    .input(call.abi_encode().into())
            }
        }
    }
}

#[async_trait]
impl Submitter for EvmSubmitter {
    async fn submit(&self, src: ChainId, body: &MessageBody) -> Result<B256, SubmitError> {
        let tx = self.request_for(src, body);

        if self.account.is_none() {
            // Simulation-only mode.
            self.provider.call(tx).await.map_err(|e| {
                let reason = e.to_string();
                if reason.contains("revert") {
                    SubmitError::Rejected(reason)
                } else {
                    SubmitError::Transient(reason)
                }
            })?;
            tracing::debug!(kind = body.kind(), "submission simulated (no signer configured)");
            return Ok(B256::ZERO);
        }

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| SubmitError::Transient(e.to_string()))?;
        let tx_hash = *pending.tx_hash();

        tracing::debug!(%tx_hash, kind = body.kind(), "transaction sent, waiting for confirmation");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| SubmitError::Transient(e.to_string()))?;
        if !receipt.status() {
            return Err(SubmitError::Rejected(format!(
                "transaction reverted: {tx_hash}"
            )));
        }

        Ok(tx_hash)
    }
}

impl std::fmt::Debug for EvmSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmSubmitter")
            .field("mcs", &self.mcs)
            .field("lightnode", &self.lightnode)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}
