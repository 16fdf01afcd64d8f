//! Retry budgets and poll intervals shared by the relayer loops.

use std::time::Duration;

/// Consecutive header-sync failures tolerated before the Maintainer
/// escalates a fatal error.
pub const RETRY_LIMIT: usize = 5;

/// Messenger back-off after failing to read the source tip.
pub const RETRY_LONG_INTERVAL: Duration = Duration::from_secs(20);

/// Maintainer back-off after failing to read the source tip.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Back-off before retrying a block whose event scan failed.
pub const BLOCK_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Sleep while the confirmation lag has not been reached.
pub const BALANCE_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Pacing between ticks once the Messenger is close to the tip.
pub const MESSENGER_INTERVAL: Duration = Duration::from_secs(3);

/// Pacing between Maintainer passes, so a destination whose anchor has
/// not moved yet is not re-polled in a tight loop.
pub const MAINTAINER_INTERVAL: Duration = Duration::from_secs(10);

/// Wait while the destination cannot verify the current height yet.
pub const VERIFY_RANGE_INTERVAL: Duration = Duration::from_secs(60);

/// Poll cadence for relayer eligibility, and the pollers' sleep while
/// ineligible.
pub const ELIGIBILITY_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on the Maintainer's wait for the next light-client block.
pub const MAX_LIGHT_CLIENT_WAIT: Duration = Duration::from_secs(600);

/// Submission retry back-off, doubled per attempt up to the cap.
pub const SUBMIT_RETRY_BASE: Duration = Duration::from_secs(2);
pub const SUBMIT_RETRY_MAX: Duration = Duration::from_secs(60);

/// Transient submission failures tolerated before a message is
/// terminal-failed.
pub const SUBMIT_ATTEMPTS: usize = 8;

/// Bounded handoff between the pollers and the destination submitter.
pub const ROUTER_QUEUE_CAPACITY: usize = 64;

/// Minimum confirmation depth whenever the destination is the Map chain.
pub const MIN_MAP_CONFIRMATIONS: u64 = 20;
