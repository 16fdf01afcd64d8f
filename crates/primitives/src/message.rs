//! Messages routed from the pollers to the destination submitter.

use alloy_primitives::{B256, Bytes, U256};
use tokio::sync::oneshot;

use crate::{ChainId, OrderId};

/// Terminal state of a routed message, reported back to the producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Confirmed on the destination chain.
    Confirmed { tx_hash: B256 },
    /// Permanently failed (rejected by the verifier contract, dropped
    /// before reaching the submitter, or retries exhausted).
    Failed { reason: String },
}

impl SubmitOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// A cross-chain event together with its inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapWithProof {
    pub order_id: OrderId,
    pub block: U256,
    pub tx_hash: B256,
    pub proof: Bytes,
}

/// A light-client block update for the destination's header store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncToMap {
    pub light_client_block: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    SwapWithProof(SwapWithProof),
    SyncToMap(SyncToMap),
}

impl MessageBody {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SwapWithProof(_) => "swap_with_proof",
            Self::SyncToMap(_) => "sync_to_map",
        }
    }
}

/// A routed submission. The completion channel resolves exactly once,
/// with the message's terminal state.
#[derive(Debug)]
pub struct Message {
    pub src: ChainId,
    pub dst: ChainId,
    pub body: MessageBody,
    done: oneshot::Sender<SubmitOutcome>,
}

impl Message {
    fn new(src: ChainId, dst: ChainId, body: MessageBody) -> (Self, oneshot::Receiver<SubmitOutcome>) {
        let (done, rx) = oneshot::channel();
        (
            Self {
                src,
                dst,
                body,
                done,
            },
            rx,
        )
    }

    pub fn swap_with_proof(
        src: ChainId,
        dst: ChainId,
        swap: SwapWithProof,
    ) -> (Self, oneshot::Receiver<SubmitOutcome>) {
        Self::new(src, dst, MessageBody::SwapWithProof(swap))
    }

    pub fn sync_to_map(
        src: ChainId,
        dst: ChainId,
        light_client_block: Bytes,
    ) -> (Self, oneshot::Receiver<SubmitOutcome>) {
        Self::new(
            src,
            dst,
            MessageBody::SyncToMap(SyncToMap { light_client_block }),
        )
    }

    /// Resolve the completion channel. The producer may already have gone
    /// away (e.g. during shutdown), which is fine.
    pub fn resolve(self, outcome: SubmitOutcome) {
        let _ = self.done.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_reaches_the_producer() {
        let (message, done) = Message::sync_to_map(1, 2, Bytes::from_static(b"block"));
        message.resolve(SubmitOutcome::Confirmed {
            tx_hash: B256::repeat_byte(0x01),
        });
        assert!(done.await.unwrap().is_confirmed());
    }

    #[tokio::test]
    async fn dropped_message_closes_the_channel() {
        let (message, done) = Message::sync_to_map(1, 2, Bytes::new());
        drop(message);
        assert!(done.await.is_err());
    }
}
