//! Sync error types.

use thiserror::Error;

/// Sync errors.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Wire frame failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Chain-side failure.
    #[error(transparent)]
    Chain(#[from] galena_chain::ChainError),

    /// Operation requires a genesis block.
    #[error("chain not initialized")]
    NotInitialized,

    /// Transport refused the frame.
    #[error("publish failed: {0}")]
    Publish(String),
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
