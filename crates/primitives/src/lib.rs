//! Core types shared by the compass relayer crates.

pub mod interval;
pub mod message;
pub mod record;
pub mod status;

pub use message::{Message, MessageBody, SubmitOutcome, SwapWithProof, SyncToMap};
pub use record::{LightClientBlock, LogRecord, ReceiptRecord};
pub use status::{RelayerStatus, VerifyRange};

/// Numeric chain identifier, as used by the destination contracts.
pub type ChainId = u64;

/// Block height. Height arithmetic (epoch gaps, confirmation lags) is done
/// in 256 bits; the u64 RPC boundary is the transport's concern.
pub type BlockHeight = alloy_primitives::U256;

/// 32-byte cross-chain message identifier, the first 32 bytes of an
/// event's data payload.
pub type OrderId = alloy_primitives::B256;
