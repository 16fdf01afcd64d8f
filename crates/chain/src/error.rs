//! Error type for the chain capability layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    /// Transport-level failure; callers treat these as transient.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The response could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The chain does not provide this capability.
    #[error("{0} is not supported by this chain")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, ChainError>;
