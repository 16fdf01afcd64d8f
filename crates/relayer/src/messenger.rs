//! Event sync loop.
//!
//! Scans source blocks one at a time once they are buried under the
//! confirmation depth, assembles an inclusion proof per matching log, and
//! hands the resulting messages to the router. The cursor only advances
//! after every message for the block reached a terminal state, so a crash
//! can only ever re-emit, never skip.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use alloy_primitives::{Address, U256};
use compass_chain::{Connection, MapClient, MethodRegistry, ProofAssembler};
use compass_primitives::{
    ChainId, Message, SubmitOutcome, SwapWithProof,
    interval::{
        BALANCE_RETRY_INTERVAL, BLOCK_RETRY_INTERVAL, ELIGIBILITY_INTERVAL, MESSENGER_INTERVAL,
        RETRY_LONG_INTERVAL, VERIFY_RANGE_INTERVAL,
    },
};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::{
    alert::Alerter,
    checkpoint::CheckpointStore,
    config::ChainConfig,
    cursor::SharedCursor,
    error::{RelayerError, Result},
    metrics,
    router::Router,
};

pub struct Messenger {
    name: String,
    src: ChainId,
    dst: ChainId,
    mcs_contract: Address,
    registry: MethodRegistry,
    confirmations: U256,
    proof_depth: u64,
    start_block: U256,
    conn: Arc<dyn Connection>,
    map: Arc<dyn MapClient>,
    assembler: Arc<dyn ProofAssembler>,
    router: Router,
    store: Arc<CheckpointStore>,
    alerter: Alerter,
    eligible: Arc<AtomicBool>,
    cursor: SharedCursor,
    shutdown: CancellationToken,
}

impl Messenger {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &ChainConfig,
        dst: ChainId,
        conn: Arc<dyn Connection>,
        map: Arc<dyn MapClient>,
        assembler: Arc<dyn ProofAssembler>,
        router: Router,
        store: Arc<CheckpointStore>,
        alerter: Alerter,
        eligible: Arc<AtomicBool>,
        cursor: SharedCursor,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let mcs_contract: Address = config.mcs_contract.parse().map_err(|e| {
            RelayerError::Config(format!("invalid mcs contract for {}: {e}", config.name))
        })?;
        if config.proof_confirm_depth == 0 {
            return Err(RelayerError::Config(format!(
                "proof_confirm_depth must be positive for {}",
                config.name
            )));
        }
        Ok(Self {
            name: config.name.clone(),
            src: config.chain_id,
            dst,
            mcs_contract,
            registry: config.method_registry(),
            confirmations: config.effective_confirmations(),
            proof_depth: config.proof_confirm_depth,
            start_block: U256::from(config.start_block),
            conn,
            map,
            assembler,
            router,
            store,
            alerter,
            eligible,
            cursor,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let start = self.store.load(self.src).unwrap_or(self.start_block);
        self.cursor.advance_to(start);
        tracing::info!(
            chain = %self.name,
            start = %self.cursor.get(),
            confirmations = %self.confirmations,
            "starting messenger"
        );

        loop {
            if self.shutdown.is_cancelled() {
                return Err(RelayerError::Shutdown);
            }
            if !self.eligible.load(Ordering::Acquire) {
                self.idle(ELIGIBILITY_INTERVAL).await?;
                continue;
            }
            self.tick().await?;
        }
    }

    /// One iteration: either the cursor advances by exactly one, or the
    /// loop slept without mutating state.
    async fn tick(&self) -> Result<()> {
        let current = self.cursor.get();

        let latest = match self.conn.latest_block().await {
            Ok(latest) => latest,
            Err(err) => {
                tracing::error!(chain = %self.name, block = %current, %err, "unable to get latest block");
                return self.idle(RETRY_LONG_INTERVAL).await;
            }
        };
        metrics::record_latest_known(&self.name, latest);

        match self.map.verify_range(self.src).await {
            Ok(range) => {
                if range.caps_above(current) {
                    tracing::info!(
                        chain = %self.name,
                        block = %current,
                        right = %range.right,
                        "destination cannot verify this height yet"
                    );
                    return self.idle(VERIFY_RANGE_INTERVAL).await;
                }
                if range.starts_after(current) {
                    tracing::info!(
                        chain = %self.name,
                        block = %current,
                        left = %range.left,
                        "fast-forwarding below the verifiable range"
                    );
                    self.cursor.advance_to(range.left);
                    return Ok(());
                }
            }
            Err(err) => {
                tracing::warn!(chain = %self.name, %err, "failed to fetch verify range");
            }
        }

        if latest.saturating_sub(current) < self.confirmations {
            tracing::debug!(chain = %self.name, target = %current, latest = %latest, "block not ready, will retry");
            return self.idle(BALANCE_RETRY_INTERVAL).await;
        }

        let completions = match self.events_for_block(current).await {
            Ok(completions) => completions,
            Err(err) => {
                tracing::error!(chain = %self.name, block = %current, %err, "failed to get events for block");
                self.alerter.fire(format!(
                    "{} messenger failed at block {current}: {err}",
                    self.name
                ));
                return self.idle(BLOCK_RETRY_INTERVAL).await;
            }
        };

        self.wait_until_handled(completions).await;

        // Best-effort resume point; a lost write just re-processes.
        self.store.store(self.src, current);
        metrics::record_processed(&self.name, current);

        self.cursor.advance_to(current + U256::from(1u64));

        if latest.saturating_sub(self.cursor.get()) <= self.confirmations {
            self.idle(MESSENGER_INTERVAL).await?;
        }
        Ok(())
    }

    /// Extract and route every matching event in the block. Returns one
    /// completion per emitted message, in `(block, log_index)` order.
    async fn events_for_block(
        &self,
        block: U256,
    ) -> std::result::Result<Vec<oneshot::Receiver<SubmitOutcome>>, compass_chain::ChainError>
    {
        let logs = self
            .conn
            .filter_logs(block, block, self.mcs_contract, &self.registry.topics())
            .await?;
        tracing::debug!(chain = %self.name, %block, logs = logs.len(), "scanned block");

        let mut completions = Vec::new();
        for log in &logs {
            let Some(topic0) = log.topic0() else {
                continue;
            };
            let Some(method) = self.registry.resolve(topic0) else {
                continue;
            };
            let Some(order_id) = log.order_id() else {
                tracing::warn!(
                    chain = %self.name,
                    tx = %log.tx_hash,
                    log_index = log.log_index,
                    "log data shorter than an order id, skipping"
                );
                continue;
            };

            let proof = self.assemble_proof(block, log, method).await?;
            let (message, done) = Message::swap_with_proof(
                self.src,
                self.dst,
                SwapWithProof {
                    order_id,
                    block,
                    tx_hash: log.tx_hash,
                    proof,
                },
            );
            tracing::info!(
                chain = %self.name,
                block = %log.block_number,
                tx = %log.tx_hash,
                log_index = log.log_index,
                order_id = %order_id,
                method = %method,
                "event found"
            );
            if let Err(err) = self.router.send(message) {
                // The message is dropped; the scan continues and the
                // cursor still advances.
                tracing::error!(chain = %self.name, %err, "failed to route message");
            }
            completions.push(done);
        }
        Ok(completions)
    }

    async fn assemble_proof(
        &self,
        block: U256,
        log: &compass_primitives::LogRecord,
        method: compass_chain::Method,
    ) -> std::result::Result<alloy_primitives::Bytes, compass_chain::ChainError> {
        let tx_hashes = self.conn.block_tx_hashes(block).await?;
        let receipts = self.conn.receipts(&tx_hashes).await?;

        let mut headers = Vec::with_capacity(self.proof_depth as usize);
        for i in 0..self.proof_depth {
            headers.push(self.conn.header_by_number(block + U256::from(i)).await?);
        }

        self.assembler
            .assemble(self.src, &headers, &receipts, log, method)
    }

    /// Back-pressure: every message emitted for the block must reach a
    /// terminal state before the cursor may advance. Shutdown does not
    /// abort in-flight submissions, so this await is not raced against
    /// the cancellation token.
    async fn wait_until_handled(&self, completions: Vec<oneshot::Receiver<SubmitOutcome>>) {
        for done in futures::future::join_all(completions).await {
            match done {
                Ok(SubmitOutcome::Confirmed { .. }) => {}
                Ok(SubmitOutcome::Failed { reason }) => {
                    tracing::warn!(chain = %self.name, %reason, "message reached terminal failure");
                }
                Err(_) => {
                    tracing::warn!(chain = %self.name, "message dropped before reaching the submitter");
                }
            }
        }
    }

    async fn idle(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(RelayerError::Shutdown),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
