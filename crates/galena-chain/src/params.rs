//! Network parameters.

/// Distinguished sender address of miner-reward transactions.
pub const COINBASE_SENDER: &str = "COINBASE";

/// Coinbase amount of the genesis block.
pub const GENESIS_REWARD: u64 = 1000;

/// Base coinbase amount of every mined block; the full reward adds the
/// prices of the included transactions.
pub const BASE_BLOCK_REWARD: u64 = 100;

/// Initial PoW target is `2^INITIAL_DIFFICULTY_BITS`.
pub const INITIAL_DIFFICULTY_BITS: u64 = 240;

/// Desired seconds between blocks, used by the retargeting rule.
pub const TARGET_BLOCK_INTERVAL_SECS: i64 = 30;

/// Number of trailing blocks the retargeting rule looks back over.
pub const DIFFICULTY_WINDOW: usize = 10;

/// Maximum mempool transactions selected into a mined block.
pub const MAX_BLOCK_TXS: usize = 20;

/// Length of a recoverable signature: 64 compact bytes plus the recovery id.
pub const SIGNATURE_BYTES: usize = 65;

/// Length of the address payload (rightmost Keccak-256 bytes).
pub const ADDRESS_BYTES: usize = 20;
