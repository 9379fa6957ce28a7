//! Proof-of-work blocks.

use crate::encoding;
use crate::merkle::sha256;
use crate::transaction::Transaction;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Digest of the header string
/// `"{index}{hex(previous_hash)}{timestamp}{miner}{nonce}"`.
///
/// `previous_hash` renders as lowercase hex without a prefix and as the
/// empty string for genesis.
pub fn header_digest(
    index: u64,
    previous_hash: &[u8],
    timestamp: i64,
    miner: &str,
    nonce: u64,
) -> [u8; 32] {
    let header = format!(
        "{}{}{}{}{}",
        index,
        hex::encode(previous_hash),
        timestamp,
        miner,
        nonce
    );
    sha256(header.as_bytes())
}

/// Block identity: SHA-256 of the Merkle root.
pub fn hash_from_root(merkle_root: &[u8]) -> [u8; 32] {
    sha256(merkle_root)
}

/// A block: header fields, ordered body, and the PoW commitments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Height in the chain; genesis is 0.
    pub index: u64,
    /// Hash of the parent block; empty for genesis.
    #[serde(with = "hex::serde")]
    pub previous_hash: Vec<u8>,
    /// Unix seconds at assembly time.
    pub timestamp: i64,
    /// Ordered body; a coinbase reward occupies position 0.
    pub transactions: Vec<Transaction>,
    /// Address credited by the coinbase.
    pub miner: String,
    /// Proof-of-work counter.
    pub nonce: u64,
    /// Block identity, committed below `difficulty`.
    #[serde(with = "hex::serde")]
    pub hash: Vec<u8>,
    /// PoW target this block was mined under.
    #[serde(with = "encoding::biguint_decimal")]
    pub difficulty: BigUint,
    /// Merkle root over the header digest and body.
    #[serde(with = "hex::serde")]
    pub merkle_root: Vec<u8>,
}

impl Block {
    /// Digest of this block's header fields.
    pub fn header_digest(&self) -> [u8; 32] {
        header_digest(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.miner,
            self.nonce,
        )
    }

    /// Whether `hash`, read as a big-endian integer, is strictly below the
    /// difficulty target.
    pub fn meets_difficulty(&self) -> bool {
        BigUint::from_bytes_be(&self.hash) < self.difficulty
    }

    /// Structural equality: header fields plus the Merkle root.
    pub fn structural_eq(&self, other: &Block) -> bool {
        self.index == other.index
            && self.previous_hash == other.previous_hash
            && self.timestamp == other.timestamp
            && self.miner == other.miner
            && self.nonce == other.nonce
            && self.hash == other.hash
            && self.difficulty == other.difficulty
            && self.merkle_root == other.merkle_root
    }

    /// Whether this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::MerkleTree;

    fn sealed(index: u64, previous_hash: Vec<u8>, difficulty: BigUint) -> Block {
        let timestamp = 1_700_000_000;
        let miner = "0xaaaa";
        let digest = header_digest(index, &previous_hash, timestamp, miner, 0);
        let root = MerkleTree::compute(&digest, &[]).unwrap().root();

        Block {
            index,
            previous_hash,
            timestamp,
            transactions: Vec::new(),
            miner: miner.to_string(),
            nonce: 0,
            hash: hash_from_root(&root).to_vec(),
            difficulty,
            merkle_root: root.to_vec(),
        }
    }

    #[test]
    fn test_header_digest_matches_manual_encoding() {
        let block = sealed(3, vec![0xab, 0xcd], BigUint::from(1u8) << 240);
        let manual = format!("3abcd{}0xaaaa0", block.timestamp);

        assert_eq!(block.header_digest(), sha256(manual.as_bytes()));
    }

    #[test]
    fn test_genesis_header_uses_empty_hex() {
        let block = sealed(0, Vec::new(), BigUint::from(1u8) << 240);
        let manual = format!("0{}0xaaaa0", block.timestamp);

        assert_eq!(block.header_digest(), sha256(manual.as_bytes()));
        assert!(block.is_genesis());
    }

    #[test]
    fn test_meets_difficulty_is_strict() {
        let mut block = sealed(1, vec![1u8; 32], BigUint::default());
        block.difficulty = BigUint::from_bytes_be(&block.hash);
        assert!(!block.meets_difficulty());

        block.difficulty += 1u8;
        assert!(block.meets_difficulty());
    }

    #[test]
    fn test_structural_eq() {
        let a = sealed(2, vec![7u8; 32], BigUint::from(1u8) << 240);
        let mut b = a.clone();
        assert!(a.structural_eq(&b));

        b.nonce += 1;
        assert!(!a.structural_eq(&b));
    }

    #[test]
    fn test_serde_round_trip() {
        let block = sealed(4, vec![9u8; 32], BigUint::from(1u8) << 240);
        let encoded = serde_json::to_vec(&block).unwrap();
        let decoded: Block = serde_json::from_slice(&encoded).unwrap();

        assert!(block.structural_eq(&decoded));
        assert_eq!(block.transactions, decoded.transactions);
    }
}
