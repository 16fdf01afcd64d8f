//! Best-effort chain tip estimator.
//!
//! Samples the tip over RPC every few ticks and extrapolates by one block
//! per tick in between, adapting the tick length to the observed block
//! production rate. The latest estimate is published into a watch channel
//! for the Progress Controller's rotation-window arithmetic; nothing here
//! is load-bearing for correctness, so sampling errors only log at debug.

use std::{sync::Arc, time::Duration};

use alloy_primitives::U256;
use compass_chain::Connection;
use tokio::{sync::watch, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{RelayerError, Result},
    metrics,
};

/// RPC sample frequency, in ticks. Ticks in between extrapolate.
const SAMPLE_EVERY_TICKS: u64 = 5;

/// Floor for the adapted tick length, so a burst of blocks between two
/// samples cannot turn the sampler into a hot loop.
const MIN_TICK: Duration = Duration::from_millis(250);

/// What an RPC sample told the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sample {
    /// First observation; the production-rate anchor is now set.
    Anchored,
    /// The tip moved past the anchor; the tick length was recomputed.
    /// `drifted` flags a 2x disagreement with the configured estimate.
    Advanced { drifted: bool },
    /// The tip did not move past the anchor.
    Unchanged,
}

/// Pure estimator state. The task owns the clock and the side effects;
/// everything height-and-rate lives here.
#[derive(Debug)]
struct TipEstimator {
    hint: Duration,
    interval: Duration,
    estimate: U256,
    anchor: U256,
}

impl TipEstimator {
    fn new(hint: Duration) -> Self {
        Self {
            hint,
            interval: hint,
            estimate: U256::ZERO,
            anchor: U256::ZERO,
        }
    }

    /// The current tick length: the configured hint until enough blocks
    /// were observed to measure the real production rate.
    fn interval(&self) -> Duration {
        self.interval
    }

    fn estimate(&self) -> U256 {
        self.estimate
    }

    /// Fold in an RPC sample taken `elapsed` after the anchor was set.
    fn observe(&mut self, height: U256, elapsed: Duration) -> Sample {
        let sample = if self.anchor.is_zero() {
            self.anchor = height;
            Sample::Anchored
        } else if height > self.anchor {
            let produced = u32::try_from(height - self.anchor).unwrap_or(u32::MAX);
            self.interval = (elapsed / produced).max(MIN_TICK);
            let drifted = self.interval * 2 < self.hint || self.interval > self.hint * 2;
            Sample::Advanced { drifted }
        } else {
            Sample::Unchanged
        };
        // The estimate only ever moves forward; a lagging RPC answer
        // cannot retract an extrapolated tip.
        self.estimate = self.estimate.max(height);
        sample
    }

    /// One tick without an RPC sample: assume one block was produced.
    /// Before the first observation there is nothing to extrapolate from.
    fn extrapolate(&mut self) {
        if !self.estimate.is_zero() {
            self.estimate += U256::from(1u64);
        }
    }
}

pub struct TipSampler {
    name: String,
    conn: Arc<dyn Connection>,
    /// Configured estimate of the block production interval; the sampler
    /// refines it from observations.
    interval_hint: Duration,
    tx: watch::Sender<U256>,
    shutdown: CancellationToken,
}

impl TipSampler {
    pub fn new(
        name: impl Into<String>,
        conn: Arc<dyn Connection>,
        interval_hint: Duration,
        tx: watch::Sender<U256>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            name: name.into(),
            conn,
            interval_hint,
            tx,
            shutdown,
        }
    }

    pub async fn run(self) -> Result<()> {
        let mut estimator = TipEstimator::new(self.interval_hint);
        let mut anchor_time = Instant::now();
        let mut ticks: u64 = 0;

        loop {
            if self.shutdown.is_cancelled() {
                return Err(RelayerError::Shutdown);
            }

            if ticks % SAMPLE_EVERY_TICKS == 0 || estimator.estimate().is_zero() {
                match self.conn.latest_block().await {
                    Ok(height) => match estimator.observe(height, anchor_time.elapsed()) {
                        Sample::Anchored => anchor_time = Instant::now(),
                        Sample::Advanced { drifted: true } => {
                            tracing::debug!(
                                chain = %self.name,
                                observed = ?estimator.interval(),
                                configured = ?self.interval_hint,
                                "sampled block interval drifts from the configured estimate"
                            );
                        }
                        Sample::Advanced { drifted: false } => {}
                        Sample::Unchanged => {
                            tracing::debug!(chain = %self.name, %height, "block number unchanged");
                        }
                    },
                    Err(err) => {
                        tracing::debug!(chain = %self.name, %err, "tip sample failed");
                    }
                }
            } else {
                estimator.extrapolate();
            }

            let estimate = estimator.estimate();
            if !estimate.is_zero() {
                metrics::record_sampled_tip(&self.name, estimate);
                let _ = self.tx.send(estimate);
            }

            ticks += 1;
            tokio::select! {
                _ = self.shutdown.cancelled() => return Err(RelayerError::Shutdown),
                _ = tokio::time::sleep(estimator.interval()) => {}
            }
        }
    }
}
