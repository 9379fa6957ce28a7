//! The canonical chain: verified append, balance and nonce accounting,
//! whole-chain adoption, and snapshot I/O.
//!
//! The block sequence lives behind an internal lock; callers only see
//! `&self` methods. Derived state (balances, nonces) is recomputed from the
//! sequence on demand, so there is no cache to drift. An empty sequence is
//! the pre-genesis state; every ingest path treats it as "not initialized".

use crate::block::{self, Block};
use crate::difficulty;
use crate::error::{ChainError, ChainResult, ValidationError};
use crate::merkle::MerkleTree;
use crate::params;
use crate::transaction::Transaction;
use num_bigint::{BigInt, BigUint};
use num_traits::Zero;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Upper bound on stashed ahead-of-tip blocks.
const MAX_PENDING_FORKS: usize = 64;

/// Outcome of offering a candidate chain for adoption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adoption {
    /// The candidate replaced the local sequence.
    Adopted { tip: u64 },
    /// The candidate did not strictly exceed the local tip.
    Ignored { offered: u64, local: u64 },
}

/// Tail snapshot handed to the miner: one lock acquisition, then the PoW
/// search runs without touching the chain.
#[derive(Debug, Clone)]
pub struct MiningTarget {
    /// Hash of the current tip.
    pub previous_hash: Vec<u8>,
    /// Height of the next block.
    pub index: u64,
    /// Target the next block must commit below.
    pub difficulty: BigUint,
}

#[derive(Serialize, Deserialize)]
struct ChainSnapshot {
    blocks: Vec<Block>,
}

/// The canonical ordered block sequence.
pub struct Chain {
    blocks: RwLock<Vec<Block>>,
    /// Rejected ahead-of-tip blocks, kept for hash lookups until the gap
    /// resolves. Cleared on adoption. Lock order: `blocks` before this.
    pending_forks: RwLock<HashMap<u64, Block>>,
}

impl Chain {
    /// An uninitialized chain (no genesis yet).
    pub fn new() -> Self {
        Self::from_blocks(Vec::new())
    }

    /// Wrap an existing sequence. Verification is the caller's concern.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: RwLock::new(blocks),
            pending_forks: RwLock::new(HashMap::new()),
        }
    }

    /// Whether a genesis block exists.
    pub fn is_initialized(&self) -> bool {
        !self.blocks.read().is_empty()
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Whether the chain holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    /// Clone of the tip block.
    pub fn tip(&self) -> Option<Block> {
        self.blocks.read().last().cloned()
    }

    /// Clone of the genesis block.
    pub fn genesis(&self) -> Option<Block> {
        self.blocks.read().first().cloned()
    }

    /// Snapshot of the full sequence (used to answer chain requests).
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    /// Create the genesis block crediting `miner` with the seed reward.
    ///
    /// Deterministic given the recipient and the wall-clock second of
    /// creation. Fails if a genesis already exists.
    pub fn init_genesis(&self, miner: &str) -> ChainResult<Block> {
        let mut blocks = self.blocks.write();
        if !blocks.is_empty() {
            return Err(ChainError::AlreadyInitialized);
        }

        let genesis = genesis_block(miner, unix_now())?;
        blocks.push(genesis.clone());

        info!(
            miner = %miner,
            hash = %hex::encode(&genesis.hash),
            "genesis block created"
        );
        Ok(genesis)
    }

    /// Install a restored sequence into an uninitialized chain.
    ///
    /// Used when a snapshot is loaded into an already-wired node; fails if
    /// a genesis exists. Verifying the sequence against a known genesis
    /// stays the caller's responsibility.
    pub fn install(&self, blocks: Vec<Block>) -> ChainResult<()> {
        if blocks.is_empty() {
            return Err(ValidationError::EmptyChain.into());
        }

        let mut guard = self.blocks.write();
        if !guard.is_empty() {
            return Err(ChainError::AlreadyInitialized);
        }
        *guard = blocks;
        Ok(())
    }

    /// Balance of `address` over the whole sequence.
    ///
    /// Transactions are de-duplicated by hash as a defense against a tx
    /// reappearing through reorg artifacts. May be transiently negative
    /// mid-scan; callers treat `balance < required` as a failed
    /// precondition.
    pub fn balance_of(&self, address: &str) -> BigInt {
        balance_in(&self.blocks.read(), address)
    }

    /// Next nonce for `address`: confirmed sent-count plus the
    /// caller-supplied pending count (the mempool's, taken under its own
    /// lock after this one).
    pub fn nonce_of(&self, address: &str, pending: u64) -> u64 {
        nonce_in(&self.blocks.read(), address, pending)
    }

    /// Block at `index`, if present.
    pub fn block_by_index(&self, index: u64) -> Option<Block> {
        let blocks = self.blocks.read();
        usize::try_from(index)
            .ok()
            .and_then(|i| blocks.get(i))
            .cloned()
    }

    /// Block with the given hash, searching the canonical sequence and the
    /// pending-fork stash.
    pub fn block_by_hash(&self, hash: &[u8]) -> Option<Block> {
        if let Some(found) = self.blocks.read().iter().find(|b| b.hash == hash) {
            return Some(found.clone());
        }
        self.pending_forks
            .read()
            .values()
            .find(|b| b.hash == hash)
            .cloned()
    }

    /// Verify a candidate against its predecessor over the current state.
    pub fn verify_block(&self, candidate: &Block, previous: &Block) -> Result<(), ValidationError> {
        verify_against(&self.blocks.read(), candidate, previous)
    }

    /// The verified append path.
    ///
    /// Under one write lock: the parent must be known, the block must
    /// succeed the tip, and every validation predicate must hold.
    pub fn try_extend(&self, candidate: &Block) -> Result<(), ChainError> {
        let mut blocks = self.blocks.write();
        let tip = blocks.last().cloned().ok_or(ChainError::NotInitialized)?;

        let parent_known = blocks.iter().any(|b| b.hash == candidate.previous_hash)
            || self
                .pending_forks
                .read()
                .values()
                .any(|b| b.hash == candidate.previous_hash);
        if !parent_known {
            return Err(ValidationError::UnknownParent {
                index: candidate.index,
            }
            .into());
        }

        if candidate.index != tip.index + 1 || candidate.previous_hash != tip.hash {
            return Err(ValidationError::NotExtending {
                index: candidate.index,
            }
            .into());
        }

        verify_against(&blocks, candidate, &tip)?;
        blocks.push(candidate.clone());

        info!(
            index = candidate.index,
            miner = %candidate.miner,
            txs = candidate.transactions.len(),
            hash = %hex::encode(&candidate.hash),
            "block appended"
        );
        Ok(())
    }

    /// Stash a rejected ahead-of-tip block for later hash lookups.
    pub fn stash_pending(&self, block: &Block) {
        let mut pending = self.pending_forks.write();
        if pending.len() >= MAX_PENDING_FORKS && !pending.contains_key(&block.index) {
            return;
        }
        pending.insert(block.index, block.clone());
    }

    /// Offer a peer's full sequence for adoption.
    ///
    /// Atomic under one write lock: ignored unless the offered tip strictly
    /// exceeds the local tip, replaced only after full verification against
    /// the local genesis. Equal-length competitors are never adopted.
    pub fn adopt_if_longer(&self, candidate: Vec<Block>) -> Result<Adoption, ChainError> {
        let offered = candidate
            .last()
            .ok_or(ValidationError::EmptyChain)?
            .index;

        let mut blocks = self.blocks.write();
        let local = blocks.last().ok_or(ChainError::NotInitialized)?.index;
        if offered <= local {
            debug!(offered, local, "ignoring chain offer at or below our tip");
            return Ok(Adoption::Ignored { offered, local });
        }

        Self::verify_full(&candidate, &blocks[0])?;
        *blocks = candidate;
        self.pending_forks.write().clear();

        info!(tip = offered, "chain replaced by longer verified sequence");
        Ok(Adoption::Adopted { tip: offered })
    }

    /// Verify a whole sequence: the first block must structurally equal the
    /// expected genesis, then each block must verify against its
    /// predecessor over the growing prefix.
    pub fn verify_full(blocks: &[Block], expected_genesis: &Block) -> Result<(), ValidationError> {
        let first = blocks.first().ok_or(ValidationError::EmptyChain)?;
        if !first.structural_eq(expected_genesis) {
            return Err(ValidationError::GenesisMismatch);
        }

        let mut verified: Vec<Block> = Vec::with_capacity(blocks.len());
        verified.push(first.clone());

        for candidate in &blocks[1..] {
            let previous = verified[verified.len() - 1].clone();
            verify_against(&verified, candidate, &previous)?;
            verified.push(candidate.clone());
        }

        Ok(())
    }

    /// Target for the next block under the retargeting rule.
    pub fn calc_difficulty(&self) -> BigUint {
        difficulty::retarget(
            &self.blocks.read(),
            params::TARGET_BLOCK_INTERVAL_SECS,
            params::DIFFICULTY_WINDOW,
        )
    }

    /// Tail snapshot for the miner, taken under one lock acquisition.
    pub fn mining_target(&self) -> ChainResult<MiningTarget> {
        let blocks = self.blocks.read();
        let tip = blocks.last().ok_or(ChainError::NotInitialized)?;
        Ok(MiningTarget {
            previous_hash: tip.hash.clone(),
            index: tip.index + 1,
            difficulty: difficulty::retarget(
                &blocks,
                params::TARGET_BLOCK_INTERVAL_SECS,
                params::DIFFICULTY_WINDOW,
            ),
        })
    }

    /// Write the sequence as a pretty-printed JSON snapshot.
    pub fn save(&self, path: &Path) -> ChainResult<()> {
        let snapshot = ChainSnapshot {
            blocks: self.blocks.read().clone(),
        };
        let data = serde_json::to_vec_pretty(&snapshot)?;
        std::fs::write(path, data)?;
        info!(path = %path.display(), blocks = snapshot.blocks.len(), "chain saved");
        Ok(())
    }

    /// Restore a sequence from a snapshot file.
    ///
    /// The pending stash is rebuilt fresh; verifying the result against a
    /// known genesis is the caller's responsibility.
    pub fn load(path: &Path) -> ChainResult<Chain> {
        let data = std::fs::read(path)?;
        let snapshot: ChainSnapshot = serde_json::from_slice(&data)?;
        info!(path = %path.display(), blocks = snapshot.blocks.len(), "chain loaded");
        Ok(Chain::from_blocks(snapshot.blocks))
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the genesis block for `miner` at `timestamp`.
pub fn genesis_block(miner: &str, timestamp: i64) -> ChainResult<Block> {
    let txs = vec![Transaction::coinbase(
        miner,
        BigUint::from(params::GENESIS_REWARD),
        0,
    )];

    let digest = block::header_digest(0, &[], timestamp, miner, 0);
    let root = MerkleTree::compute(&digest, &txs)?.root();

    Ok(Block {
        index: 0,
        previous_hash: Vec::new(),
        timestamp,
        transactions: txs,
        miner: miner.to_string(),
        nonce: 0,
        hash: block::hash_from_root(&root).to_vec(),
        difficulty: difficulty::initial(),
        merkle_root: root.to_vec(),
    })
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn balance_in(blocks: &[Block], address: &str) -> BigInt {
    let mut balance = BigInt::zero();
    let mut seen: HashSet<[u8; 32]> = HashSet::new();

    for block in blocks {
        for tx in &block.transactions {
            // Unencodable txs fall out of the dedup defense but still count.
            if let Ok(hash) = tx.hash() {
                if !seen.insert(hash) {
                    continue;
                }
            }

            if tx.from == address {
                balance -= BigInt::from(tx.amount.clone());
            }
            if tx.to == address {
                balance += BigInt::from(tx.amount.clone());
            }
        }
    }

    balance
}

fn nonce_in(blocks: &[Block], address: &str, pending: u64) -> u64 {
    let confirmed = blocks
        .iter()
        .flat_map(|b| &b.transactions)
        .filter(|tx| tx.from == address)
        .count() as u64;
    confirmed + pending
}

/// Verify `candidate` against `previous`, with balances and nonces taken
/// over `blocks` (the state before the candidate applies).
///
/// Predicate order: index succession, parent hash, PoW target, every
/// signature, then per non-coinbase transaction in body order balance
/// sufficiency and nonce succession, and finally the Merkle recomputation.
fn verify_against(
    blocks: &[Block],
    candidate: &Block,
    previous: &Block,
) -> Result<(), ValidationError> {
    if candidate.index != previous.index + 1 {
        return Err(ValidationError::IndexMismatch {
            got: candidate.index,
            expected: previous.index + 1,
        });
    }

    if candidate.previous_hash != previous.hash {
        return Err(ValidationError::PreviousHashMismatch {
            index: candidate.index,
        });
    }

    if !candidate.meets_difficulty() {
        return Err(ValidationError::DifficultyNotMet {
            hash: hex::encode(&candidate.hash),
            target: candidate.difficulty.to_string(),
        });
    }

    for tx in &candidate.transactions {
        tx.verify_signature()?;
    }

    let mut in_block: HashMap<&str, u64> = HashMap::new();
    for (i, tx) in candidate.transactions.iter().enumerate() {
        if tx.is_coinbase() {
            continue;
        }

        let required = BigInt::from(&tx.amount + &tx.price);
        let available = balance_in(blocks, &tx.from);
        if available < required {
            return Err(ValidationError::InsufficientBalance {
                index: i,
                from: tx.from.clone(),
                required: required.to_string(),
                available: available.to_string(),
            });
        }

        let earlier = in_block.get(tx.from.as_str()).copied().unwrap_or(0);
        let expected = nonce_in(blocks, &tx.from, earlier);
        in_block.insert(tx.from.as_str(), earlier + 1);

        if tx.nonce != expected {
            return Err(ValidationError::NonceMismatch {
                index: i,
                from: tx.from.clone(),
                got: tx.nonce,
                expected,
            });
        }
    }

    let digest = candidate.header_digest();
    let recomputed = MerkleTree::compute(&digest, &candidate.transactions)
        .map_err(|e| ValidationError::Encoding(e.to_string()))?
        .root();
    if candidate.merkle_root != recomputed {
        return Err(ValidationError::MerkleMismatch {
            committed: hex::encode(&candidate.merkle_root),
            computed: hex::encode(recomputed),
        });
    }

    Ok(())
}
