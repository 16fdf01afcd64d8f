//! Chain capability interfaces and their EVM implementations.
//!
//! The relayer engine only ever talks to chains through the traits in this
//! crate:
//!
//! - [`Connection`]: read side of a source chain (tip, logs, headers,
//!   receipts, optional light-client extension)
//! - [`MapClient`]: read side of the destination Map chain (verify range,
//!   anchored heights, relayer status)
//! - [`Submitter`]: write side of the destination Map chain
//! - [`ProofAssembler`]: chain-specific event inclusion proof encoding
//!
//! The `Evm*` types implement them over alloy HTTP providers.

pub mod connection;
pub mod error;
pub mod evm;
pub mod map;
pub mod method;
pub mod proof;
pub mod submit;

pub use connection::Connection;
pub use error::{ChainError, Result};
pub use evm::EvmConnection;
pub use map::{EvmMapClient, MapClient};
pub use method::{Method, MethodRegistry};
pub use proof::{EvmProofAssembler, ProofAssembler};
pub use submit::{EvmSubmitter, SubmitError, Submitter};
