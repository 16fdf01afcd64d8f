//! Engine error type.

use compass_chain::ChainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayerError {
    /// The shutdown signal was observed; loops terminate cleanly with
    /// this, it is not a failure.
    #[error("polling terminated")]
    Shutdown,

    /// The Maintainer exhausted its header-sync retry budget.
    #[error("header sync retries exceeded for {chain}")]
    FatalPolling { chain: String },

    /// The submission queue refused a message.
    #[error("router queue full or closed")]
    Routing,

    /// A header relay reached a terminal failure at the destination.
    #[error("header submission failed: {0}")]
    Submission(String),

    /// A configuration value could not be interpreted.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub type Result<T> = std::result::Result<T, RelayerError>;
