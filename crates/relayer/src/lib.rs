//! The compass relayer engine.
//!
//! Per source chain the engine runs two cooperating pollers: a
//! [`Maintainer`] keeping the destination's light client anchored near
//! the source tip, and a [`Messenger`] extracting cross-chain events and
//! assembling inclusion proofs. Both feed a single-writer submission
//! pipeline ([`Router`]) toward the Map chain; a [`ProgressController`]
//! gates them on relayer eligibility; a [`CheckpointStore`] keeps
//! per-chain resume points.
//!
//! Safety between the pollers is indirect: the Messenger respects the
//! destination's verify range, which only the Maintainer advances, so an
//! event proof is never submitted before the light client can check it.

pub mod alert;
pub mod checkpoint;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod maintainer;
pub mod messenger;
pub mod metrics;
pub mod progress;
pub mod router;
pub mod sampler;

pub use alert::Alerter;
pub use checkpoint::CheckpointStore;
pub use config::{ChainConfig, Config, EventMapping, MapConfig};
pub use cursor::SharedCursor;
pub use engine::Engine;
pub use error::{RelayerError, Result};
pub use maintainer::Maintainer;
pub use messenger::Messenger;
pub use progress::ProgressController;
pub use router::{Router, SubmitterTask};
pub use sampler::TipSampler;
