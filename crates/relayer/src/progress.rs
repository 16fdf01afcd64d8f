//! Relayer eligibility control.
//!
//! A background task polls the destination for this relayer's
//! registration and rotation window and publishes a single `eligible`
//! flag the pollers consult. Staleness only costs extra sleep, so an
//! atomic is all the synchronisation the flag needs.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use alloy_primitives::U256;
use compass_chain::MapClient;
use compass_primitives::{ChainId, interval::ELIGIBILITY_INTERVAL};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    cursor::SharedCursor,
    error::{RelayerError, Result},
};

pub struct ProgressController {
    map: Arc<dyn MapClient>,
    eligible: Arc<AtomicBool>,
    dst_tip: watch::Receiver<U256>,
    /// Messenger cursors to refresh from the destination when
    /// eligibility is regained.
    cursors: Vec<(ChainId, SharedCursor)>,
    shutdown: CancellationToken,
}

impl ProgressController {
    pub fn new(
        map: Arc<dyn MapClient>,
        eligible: Arc<AtomicBool>,
        dst_tip: watch::Receiver<U256>,
        cursors: Vec<(ChainId, SharedCursor)>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            map,
            eligible,
            dst_tip,
            cursors,
            shutdown,
        }
    }

    pub async fn run(self) -> Result<()> {
        let mut was_eligible = false;
        loop {
            if self.shutdown.is_cancelled() {
                return Err(RelayerError::Shutdown);
            }

            let status = match self.map.relayer_status().await {
                Ok(status) => status,
                Err(err) => {
                    tracing::warn!(%err, "failed to fetch relayer status");
                    self.pause(&mut was_eligible).await?;
                    continue;
                }
            };

            let dst_height = *self.dst_tip.borrow();
            if !status.eligible_at(dst_height) {
                if !status.registered {
                    tracing::info!("relayer account is not registered");
                } else if !status.active_relayer {
                    tracing::info!("registered but not selected as a relayer");
                } else {
                    tracing::info!(
                        start = %status.period_start,
                        end = %status.period_end,
                        %dst_height,
                        "outside the active rotation window"
                    );
                }
                self.pause(&mut was_eligible).await?;
                continue;
            }

            if !was_eligible {
                // Local cursors may be stale after a pause; refresh them
                // from the destination before releasing the pollers. One
                // failed call keeps us ineligible for the tick.
                if let Err(err) = self.refresh_cursors().await {
                    tracing::warn!(%err, "cursor refresh failed, staying ineligible");
                    self.pause(&mut was_eligible).await?;
                    continue;
                }
                tracing::info!("relayer eligible, releasing pollers");
            }
            self.eligible.store(true, Ordering::Release);
            was_eligible = true;

            let horizon = rotation_horizon(status.period_end, dst_height, self.map.block_interval());
            self.idle(horizon).await?;
        }
    }

    async fn pause(&self, was_eligible: &mut bool) -> Result<()> {
        self.eligible.store(false, Ordering::Release);
        *was_eligible = false;
        self.idle(ELIGIBILITY_INTERVAL).await
    }

    async fn refresh_cursors(&self) -> compass_chain::Result<()> {
        for (chain, cursor) in &self.cursors {
            let anchored = self.map.anchored_height(*chain).await?;
            let next = anchored + U256::from(1u64);
            if cursor.advance_to(next) {
                tracing::info!(chain, cursor = %next, "cursor refreshed from destination");
            }
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

/// Estimate how long the current rotation window will still be ours:
/// half the remaining blocks at the destination's production rate, but
/// re-check at least once a minute.
fn rotation_horizon(period_end: U256, dst_height: U256, block_interval: Duration) -> Duration {
    let remaining = u64::try_from(period_end.saturating_sub(dst_height)).unwrap_or(u64::MAX);
    let estimate = block_interval.saturating_mul(u32::try_from(remaining / 2).unwrap_or(u32::MAX));
    estimate.max(ELIGIBILITY_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_is_at_least_the_poll_interval() {
        let horizon = rotation_horizon(
            U256::from(100u64),
            U256::from(99u64),
            Duration::from_secs(5),
        );
        assert_eq!(horizon, ELIGIBILITY_INTERVAL);
    }

    #[test]
    fn horizon_scales_with_remaining_blocks() {
        let horizon = rotation_horizon(
            U256::from(1_000u64),
            U256::from(0u64),
            Duration::from_secs(2),
        );
        assert_eq!(horizon, Duration::from_secs(1_000));
    }
}
