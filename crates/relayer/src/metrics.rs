//! Metric names and typed recording helpers.
//!
//! Everything goes through the `metrics` facade; the exporter is the
//! binary's choice.

use alloy_primitives::U256;
use metrics::{counter, describe_counter, describe_gauge, gauge};

pub const BLOCKS_PROCESSED: &str = "compass_blocks_processed_total";
pub const MESSAGES_SUBMITTED: &str = "compass_messages_submitted_total";
pub const MESSAGES_FAILED: &str = "compass_messages_failed_total";
pub const LATEST_KNOWN_BLOCK: &str = "compass_latest_known_block";
pub const LATEST_PROCESSED_BLOCK: &str = "compass_latest_processed_block";
pub const SAMPLED_TIP: &str = "compass_sampled_tip";
pub const SYNCED_TO_MAP_HEIGHT: &str = "compass_synced_to_map_height";

/// Register metric descriptions. Call once at startup.
pub fn describe() {
    describe_counter!(BLOCKS_PROCESSED, "Source blocks fully processed");
    describe_counter!(MESSAGES_SUBMITTED, "Messages confirmed on the destination");
    describe_counter!(MESSAGES_FAILED, "Messages that reached a terminal failure");
    describe_gauge!(LATEST_KNOWN_BLOCK, "Latest observed source tip");
    describe_gauge!(LATEST_PROCESSED_BLOCK, "Latest fully processed source height");
    describe_gauge!(SAMPLED_TIP, "Best-effort extrapolated chain tip");
    describe_gauge!(SYNCED_TO_MAP_HEIGHT, "Source height anchored on the Map chain");
}

/// Heights can exceed f64's integer range in theory; saturate rather than
/// panic, the gauges are diagnostics.
fn height_to_f64(height: U256) -> f64 {
    u128::try_from(height).map_or(f64::MAX, |h| h as f64)
}

pub(crate) fn record_latest_known(chain: &str, height: U256) {
    gauge!(LATEST_KNOWN_BLOCK, "chain" => chain.to_string()).set(height_to_f64(height));
}

pub(crate) fn record_processed(chain: &str, height: U256) {
    counter!(BLOCKS_PROCESSED, "chain" => chain.to_string()).increment(1);
    gauge!(LATEST_PROCESSED_BLOCK, "chain" => chain.to_string()).set(height_to_f64(height));
}

pub(crate) fn record_sampled_tip(chain: &str, height: U256) {
    gauge!(SAMPLED_TIP, "chain" => chain.to_string()).set(height_to_f64(height));
}

pub(crate) fn record_synced_to_map(chain: &str, height: U256) {
    gauge!(SYNCED_TO_MAP_HEIGHT, "chain" => chain.to_string()).set(height_to_f64(height));
}

pub(crate) fn record_submission(dst: &str, kind: &'static str, confirmed: bool) {
    let name = if confirmed {
        MESSAGES_SUBMITTED
    } else {
        MESSAGES_FAILED
    };
    counter!(name, "dst" => dst.to_string(), "kind" => kind).increment(1);
}
