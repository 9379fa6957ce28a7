//! Error types for the chain crate.

use thiserror::Error;

/// Chain-level errors.
#[derive(Error, Debug)]
pub enum ChainError {
    /// Genesis already exists.
    #[error("chain already initialized")]
    AlreadyInitialized,

    /// Operation requires a genesis block.
    #[error("chain not initialized")]
    NotInitialized,

    /// Signing or key material failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] secp256k1::Error),

    /// Canonical JSON encode/decode failure.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Snapshot file I/O failure.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A validation predicate failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Block and transaction validation failures.
///
/// Each variant carries the values that falsified the predicate so the
/// caller can log the specific reason; none of these escalate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Block index does not succeed its parent.
    #[error("block index mismatch: got {got}, expected {expected}")]
    IndexMismatch { got: u64, expected: u64 },

    /// Block does not commit to its parent's hash.
    #[error("previous hash mismatch at index {index}")]
    PreviousHashMismatch { index: u64 },

    /// No block with the referenced parent hash is known.
    #[error("unknown parent for block {index}")]
    UnknownParent { index: u64 },

    /// Block neither extends the tip nor is otherwise acceptable.
    #[error("block {index} does not extend the tip")]
    NotExtending { index: u64 },

    /// Block hash is not below its difficulty target.
    #[error("difficulty not met: hash {hash}, target {target}")]
    DifficultyNotMet { hash: String, target: String },

    /// Signature field absent on a non-coinbase transaction.
    #[error("missing signature")]
    MissingSignature,

    /// Signature is not 65 bytes.
    #[error("invalid signature length: {len}")]
    SignatureLength { len: usize },

    /// Public key recovery failed.
    #[error("signature recovery failed: {0}")]
    Recovery(String),

    /// Recovered address differs from the declared sender.
    #[error("recovered address {recovered} does not match sender {declared}")]
    AddressMismatch { recovered: String, declared: String },

    /// Sender balance cannot cover amount plus price.
    #[error("tx[{index}] insufficient balance for {from}: need {required}, have {available}")]
    InsufficientBalance {
        index: usize,
        from: String,
        required: String,
        available: String,
    },

    /// Transaction nonce is not the expected next nonce for its sender.
    #[error("tx[{index}] invalid nonce for {from}: got {got}, expected {expected}")]
    NonceMismatch {
        index: usize,
        from: String,
        got: u64,
        expected: u64,
    },

    /// Recomputed Merkle root differs from the committed root.
    #[error("merkle root mismatch: committed {committed}, computed {computed}")]
    MerkleMismatch { committed: String, computed: String },

    /// First block of a candidate chain is not the expected genesis.
    #[error("genesis block mismatch")]
    GenesisMismatch,

    /// Candidate chain carries no blocks.
    #[error("candidate chain is empty")]
    EmptyChain,

    /// Canonical encoding failed while recomputing a commitment.
    #[error("encoding error: {0}")]
    Encoding(String),
}
