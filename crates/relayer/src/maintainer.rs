//! Header sync loop.
//!
//! Keeps the destination's light client anchored close to the source tip
//! by relaying one light-client block per elapsed epoch. Header sync runs
//! on a bounded retry budget: transport errors are absorbed, repeated
//! failure escalates on the system-error channel so the orchestrator can
//! decide between restart and abort. The Messenger is unaffected either
//! way — it gates itself on the destination's verify range.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use alloy_primitives::U256;
use compass_chain::{Connection, MapClient};
use compass_primitives::{
    ChainId, Message, SubmitOutcome,
    interval::{
        BLOCK_RETRY_INTERVAL, ELIGIBILITY_INTERVAL, MAINTAINER_INTERVAL, MAX_LIGHT_CLIENT_WAIT,
        RETRY_INTERVAL, RETRY_LIMIT,
    },
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ChainConfig,
    error::{RelayerError, Result},
    metrics,
    router::Router,
};

pub struct Maintainer {
    name: String,
    src: ChainId,
    dst: ChainId,
    epoch_size: U256,
    conn: Arc<dyn Connection>,
    map: Arc<dyn MapClient>,
    router: Router,
    eligible: Arc<AtomicBool>,
    sys_err: mpsc::UnboundedSender<RelayerError>,
    shutdown: CancellationToken,
}

impl Maintainer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &ChainConfig,
        dst: ChainId,
        epoch_size: u64,
        conn: Arc<dyn Connection>,
        map: Arc<dyn MapClient>,
        router: Router,
        eligible: Arc<AtomicBool>,
        sys_err: mpsc::UnboundedSender<RelayerError>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        if epoch_size == 0 {
            return Err(RelayerError::Config(format!(
                "epoch_size must be positive for {}",
                config.name
            )));
        }
        Ok(Self {
            name: config.name.clone(),
            src: config.chain_id,
            dst,
            epoch_size: U256::from(epoch_size),
            conn,
            map,
            router,
            eligible,
            sys_err,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        tracing::info!(chain = %self.name, epoch_size = %self.epoch_size, "starting maintainer");
        let mut retry = RETRY_LIMIT;

        loop {
            if self.shutdown.is_cancelled() {
                return Err(RelayerError::Shutdown);
            }
            if !self.eligible.load(Ordering::Acquire) {
                self.idle(ELIGIBILITY_INTERVAL).await?;
                continue;
            }

            if retry == 0 {
                tracing::error!(chain = %self.name, "header sync failed, retries exceeded");
                let _ = self.sys_err.send(RelayerError::FatalPolling {
                    chain: self.name.clone(),
                });
                return Ok(());
            }

            let latest = match self.conn.latest_block().await {
                Ok(latest) => latest,
                Err(err) => {
                    tracing::error!(chain = %self.name, %err, "unable to get latest block");
                    self.idle(RETRY_INTERVAL).await?;
                    continue;
                }
            };
            metrics::record_latest_known(&self.name, latest);

            match self.sync_headers_to_map(latest).await {
                Ok(()) => {
                    retry = RETRY_LIMIT;
                    self.idle(MAINTAINER_INTERVAL).await?;
                }
                Err(RelayerError::Shutdown) => return Err(RelayerError::Shutdown),
                Err(err) => {
                    tracing::error!(chain = %self.name, block = %latest, %err, "failed to sync header for block");
                    retry -= 1;
                    self.idle(BLOCK_RETRY_INTERVAL).await?;
                }
            }
        }
    }

    /// Advance the destination's light client up to `latest`, one epoch
    /// block at a time, awaiting confirmation between sends so emitted
    /// heights stay strictly increasing.
    async fn sync_headers_to_map(&self, latest: U256) -> Result<()> {
        let anchored = self.map.anchored_height(self.src).await?;
        if latest < anchored {
            // Possible during a warm start; the source will catch up.
            tracing::debug!(chain = %self.name, %latest, %anchored, "destination is ahead");
            self.idle(RETRY_INTERVAL).await?;
            return Ok(());
        }

        let blocks = latest - anchored;
        if blocks < self.epoch_size {
            let gap = (self.epoch_size - blocks) / U256::from(10u64);
            let wait =
                Duration::from_secs(u64::try_from(gap).unwrap_or(u64::MAX)).min(MAX_LIGHT_CLIENT_WAIT);
            tracing::info!(
                chain = %self.name,
                target = %(anchored + self.epoch_size),
                "waiting for the next light client block"
            );
            self.idle(wait).await?;
            return Ok(());
        }

        let count = u64::try_from(blocks / self.epoch_size).unwrap_or(u64::MAX);
        let mut number = anchored;
        for _ in 0..count {
            let header = self.conn.header_by_number(number).await?;
            let light_block = self.conn.next_light_client_block(header.hash).await?;
            tracing::info!(
                chain = %self.name,
                number = %light_block.height,
                hash = %light_block.hash,
                "fetched next light client block"
            );
            if light_block.height <= number {
                return Err(RelayerError::Chain(compass_chain::ChainError::Decode(
                    format!(
                        "light client block at {} did not advance past {number}",
                        light_block.height
                    ),
                )));
            }

            let (message, done) =
                Message::sync_to_map(self.src, self.dst, light_block.encoded.clone());
            if let Err(err) = self.router.send(message) {
                // A routing failure ends the pass without consuming a
                // retry; the next pass re-reads the anchored height.
                tracing::error!(chain = %self.name, %err, "failed to route light client block");
                return Ok(());
            }

            match done.await {
                Ok(SubmitOutcome::Confirmed { .. }) => {}
                Ok(SubmitOutcome::Failed { reason }) => {
                    return Err(RelayerError::Submission(reason));
                }
                Err(_) => {
                    return Err(RelayerError::Submission(
                        "dropped before reaching the submitter".into(),
                    ));
                }
            }

            number = light_block.height;
            metrics::record_synced_to_map(&self.name, number);
        }
        Ok(())
    }

    async fn idle(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(RelayerError::Shutdown),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
