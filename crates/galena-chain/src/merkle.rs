//! Merkle commitment over block contents.
//!
//! Leaves are the header digest followed by the canonical encoding of each
//! transaction in body order; every input is hashed with SHA-256, internal
//! nodes hash the concatenation of their children, and an odd node at any
//! level is paired with itself. Root equality is the sole semantic equality
//! used for block content verification.

use crate::error::ChainResult;
use crate::transaction::Transaction;
use sha2::{Digest, Sha256};

/// SHA-256 digest.
pub(crate) fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Leaf hash of a transaction's canonical encoding.
pub fn tx_leaf(tx: &Transaction) -> ChainResult<[u8; 32]> {
    Ok(sha256(&tx.canonical_bytes()?))
}

/// Binary hash tree; level 0 holds the leaf hashes, the last level the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Commit to a block's header digest and ordered transactions.
    pub fn compute(header_digest: &[u8; 32], txs: &[Transaction]) -> ChainResult<Self> {
        let mut leaves = Vec::with_capacity(1 + txs.len());
        for tx in txs {
            leaves.push(tx_leaf(tx)?);
        }
        Ok(Self::with_tx_leaves(header_digest, &leaves))
    }

    /// Commit with pre-hashed transaction leaves, for callers that rebuild
    /// the tree repeatedly while only the header digest changes.
    pub fn with_tx_leaves(header_digest: &[u8; 32], tx_leaves: &[[u8; 32]]) -> Self {
        let mut leaves = Vec::with_capacity(1 + tx_leaves.len());
        leaves.push(sha256(header_digest));
        leaves.extend_from_slice(tx_leaves);
        Self::from_leaves(leaves)
    }

    fn from_leaves(leaves: Vec<[u8; 32]>) -> Self {
        let mut levels = vec![leaves];

        while levels[levels.len() - 1].len() > 1 {
            let current = &levels[levels.len() - 1];
            let mut next = Vec::with_capacity(current.len().div_ceil(2));

            for pair in current.chunks(2) {
                let left = &pair[0];
                let right = if pair.len() == 2 { &pair[1] } else { &pair[0] };
                next.push(hash_pair(left, right));
            }

            levels.push(next);
        }

        Self { levels }
    }

    /// The root digest.
    pub fn root(&self) -> [u8; 32] {
        match self.levels.last().and_then(|level| level.first()) {
            Some(root) => *root,
            None => [0u8; 32],
        }
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(Vec::len).unwrap_or(0)
    }
}
