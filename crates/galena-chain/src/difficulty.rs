//! Difficulty retargeting.
//!
//! The target scales with the observed pace of the trailing window: blocks
//! arriving slower than the desired interval raise the target (easier),
//! faster blocks tighten it. Intermediate math is signed so clock skew
//! between miners clamps to the floor instead of wrapping.

use crate::block::Block;
use num_bigint::{BigInt, BigUint};
use num_traits::One;

/// The initial target, `2^240`.
pub fn initial() -> BigUint {
    BigUint::one() << crate::params::INITIAL_DIFFICULTY_BITS
}

/// Target for the next block given the current sequence.
///
/// Until the chain outgrows the window this is [`initial`]; afterwards
/// `max(1, latest.difficulty * actual / expected)` where `actual` is the
/// wall-clock span of the last `window` blocks and `expected` is
/// `target_interval_secs * window`.
pub fn retarget(blocks: &[Block], target_interval_secs: i64, window: usize) -> BigUint {
    let n = blocks.len();
    if n <= window {
        return initial();
    }

    let latest = &blocks[n - 1];
    let past = &blocks[n - 1 - window];

    let actual = BigInt::from(latest.timestamp - past.timestamp);
    let expected = BigInt::from(target_interval_secs * window as i64);

    let scaled = BigInt::from(latest.difficulty.clone()) * actual / expected;
    if scaled < BigInt::one() {
        BigUint::one()
    } else {
        scaled.to_biguint().unwrap_or_else(BigUint::one)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{hash_from_root, header_digest};
    use crate::merkle::MerkleTree;

    fn block_at(index: u64, timestamp: i64, difficulty: BigUint) -> Block {
        let digest = header_digest(index, &[], timestamp, "0xaaaa", 0);
        let root = MerkleTree::compute(&digest, &[]).unwrap().root();
        Block {
            index,
            previous_hash: Vec::new(),
            timestamp,
            transactions: Vec::new(),
            miner: "0xaaaa".to_string(),
            nonce: 0,
            hash: hash_from_root(&root).to_vec(),
            difficulty,
            merkle_root: root.to_vec(),
        }
    }

    fn chain_with_interval(len: usize, interval: i64) -> Vec<Block> {
        (0..len)
            .map(|i| block_at(i as u64, 1_700_000_000 + interval * i as i64, initial()))
            .collect()
    }

    #[test]
    fn test_initial_until_window_outgrown() {
        assert_eq!(retarget(&chain_with_interval(1, 30), 30, 10), initial());
        assert_eq!(retarget(&chain_with_interval(10, 30), 30, 10), initial());
        assert_eq!(retarget(&chain_with_interval(11, 30), 30, 10), initial());
    }

    #[test]
    fn test_on_pace_keeps_target() {
        let blocks = chain_with_interval(12, 30);
        assert_eq!(retarget(&blocks, 30, 10), initial());
    }

    #[test]
    fn test_slow_blocks_raise_target() {
        let blocks = chain_with_interval(12, 60);
        assert_eq!(retarget(&blocks, 30, 10), initial() * 2u8);
    }

    #[test]
    fn test_fast_blocks_tighten_target() {
        let blocks = chain_with_interval(12, 15);
        assert_eq!(retarget(&blocks, 30, 10), initial() / 2u8);
    }

    #[test]
    fn test_clamps_to_one() {
        // Skewed clocks can make the observed span non-positive.
        let mut blocks = chain_with_interval(12, 30);
        let len = blocks.len();
        blocks[len - 1].timestamp = blocks[len - 1 - 10].timestamp - 5;

        assert_eq!(retarget(&blocks, 30, 10), BigUint::one());
    }
}
