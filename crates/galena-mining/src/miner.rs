//! Miner implementation.

use galena_chain::block::{self, Block};
use galena_chain::merkle::{tx_leaf, MerkleTree};
use galena_chain::{params, Chain, ChainError, MiningTarget, Transaction};
use galena_mempool::Mempool;
use num_bigint::BigUint;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// How often the nonce loop polls the cancel flag (every 4096 candidates).
const CANCEL_POLL_MASK: u64 = 0xfff;

/// Mining errors.
#[derive(thiserror::Error, Debug)]
pub enum MiningError {
    /// The search was abandoned through the cancel flag.
    #[error("mining cancelled")]
    Cancelled,

    /// Chain access or encoding failure.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Result type for mining operations.
pub type MiningResult<T> = Result<T, MiningError>;

/// Produces candidate blocks over a chain and mempool.
pub struct Miner {
    chain: Arc<Chain>,
    mempool: Arc<Mempool>,
    cancel: Arc<AtomicBool>,
}

impl Miner {
    /// Create a miner over shared chain and mempool handles.
    pub fn new(chain: Arc<Chain>, mempool: Arc<Mempool>) -> Self {
        Self {
            chain,
            mempool,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The flag that abandons an in-flight search when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Mine the next block crediting `miner`.
    ///
    /// Selects up to [`params::MAX_BLOCK_TXS`] transactions by price, then
    /// snapshots the tail. Lock order is fixed Mempool → Chain; neither
    /// lock is held during the search.
    pub fn mine_next(&self, miner: &str) -> MiningResult<Block> {
        let txs = self.mempool.pick_top(params::MAX_BLOCK_TXS);
        let target = self.chain.mining_target()?;

        info!(
            index = target.index,
            txs = txs.len(),
            difficulty = %target.difficulty,
            "mining candidate block"
        );
        mine_block(target, txs, miner, &self.cancel)
    }
}

/// Assemble a block body: coinbase first, then the selected transactions
/// ordered by `(nonce, sender)` ascending.
///
/// The coinbase nonce is the block index and its amount is the base reward
/// plus the prices of the included transactions.
pub fn assemble(mut txs: Vec<Transaction>, miner: &str, index: u64) -> Vec<Transaction> {
    let reward: BigUint = txs.iter().map(|tx| tx.price.clone()).sum::<BigUint>()
        + BigUint::from(params::BASE_BLOCK_REWARD);

    txs.sort_by(|a, b| a.nonce.cmp(&b.nonce).then_with(|| a.from.cmp(&b.from)));

    let mut body = Vec::with_capacity(txs.len() + 1);
    body.push(Transaction::coinbase(miner, reward, index));
    body.extend(txs);
    body
}

/// Search for a nonce sealing `txs` over the given target.
///
/// Iterates the nonce from 0 upward, recomputing the header digest, the
/// Merkle root, and the block hash per candidate until the hash falls
/// strictly below the difficulty. Transaction leaves are hashed once; only
/// the header leaf changes per candidate.
pub fn mine_block(
    target: MiningTarget,
    txs: Vec<Transaction>,
    miner: &str,
    cancel: &AtomicBool,
) -> MiningResult<Block> {
    let MiningTarget {
        previous_hash,
        index,
        difficulty,
    } = target;

    let body = assemble(txs, miner, index);
    let leaves = body
        .iter()
        .map(tx_leaf)
        .collect::<Result<Vec<_>, ChainError>>()?;
    let timestamp = unix_now();

    let mut nonce = 0u64;
    loop {
        if nonce & CANCEL_POLL_MASK == 0 && cancel.load(Ordering::Relaxed) {
            debug!(index, nonce, "mining abandoned");
            return Err(MiningError::Cancelled);
        }

        let digest = block::header_digest(index, &previous_hash, timestamp, miner, nonce);
        let root = MerkleTree::with_tx_leaves(&digest, &leaves).root();
        let hash = block::hash_from_root(&root);

        if BigUint::from_bytes_be(&hash) < difficulty {
            info!(index, nonce, hash = %hex::encode(hash), "proof-of-work found");
            return Ok(Block {
                index,
                previous_hash,
                timestamp,
                transactions: body,
                miner: miner.to_string(),
                nonce,
                hash: hash.to_vec(),
                difficulty,
                merkle_root: root.to_vec(),
            });
        }

        nonce += 1;
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use galena_chain::keys;
    use num_traits::One;
    use rand::rngs::OsRng;
    use secp256k1::SecretKey;

    fn open_flag() -> AtomicBool {
        AtomicBool::new(false)
    }

    /// A target met by half of all hashes, so searches finish immediately.
    fn easy_target(index: u64, previous_hash: Vec<u8>) -> MiningTarget {
        MiningTarget {
            previous_hash,
            index,
            difficulty: BigUint::one() << 255,
        }
    }

    #[test]
    fn test_assemble_puts_coinbase_first() {
        let secret = SecretKey::new(&mut OsRng);
        let txs = vec![
            Transaction::create(&secret, "0xbbbb", BigUint::one(), BigUint::one(), 1).unwrap(),
            Transaction::create(&secret, "0xbbbb", BigUint::one(), BigUint::one(), 0).unwrap(),
        ];

        let body = assemble(txs, "0xaaaa", 7);

        assert!(body[0].is_coinbase());
        assert_eq!(body[0].nonce, 7);
        assert_eq!(body[1].nonce, 0);
        assert_eq!(body[2].nonce, 1);
    }

    #[test]
    fn test_assemble_reward_includes_fees() {
        let secret = SecretKey::new(&mut OsRng);
        let txs = vec![
            Transaction::create(&secret, "0xbbbb", BigUint::one(), BigUint::from(5u32), 0)
                .unwrap(),
            Transaction::create(&secret, "0xbbbb", BigUint::one(), BigUint::from(3u32), 1)
                .unwrap(),
        ];

        let body = assemble(txs, "0xaaaa", 1);

        assert_eq!(
            body[0].amount,
            BigUint::from(params::BASE_BLOCK_REWARD + 5 + 3)
        );
    }

    #[test]
    fn test_assemble_ties_break_on_sender() {
        let body = assemble(
            vec![
                Transaction {
                    from: "0xcc".into(),
                    to: "0xbb".into(),
                    amount: BigUint::one(),
                    nonce: 0,
                    price: BigUint::one(),
                    signature: Some(vec![1u8; 65]),
                },
                Transaction {
                    from: "0xaa".into(),
                    to: "0xbb".into(),
                    amount: BigUint::one(),
                    nonce: 0,
                    price: BigUint::one(),
                    signature: Some(vec![2u8; 65]),
                },
            ],
            "0xdd",
            1,
        );

        assert_eq!(body[1].from, "0xaa");
        assert_eq!(body[2].from, "0xcc");
    }

    #[test]
    fn test_mined_block_meets_target() {
        let block = mine_block(
            easy_target(1, vec![7u8; 32]),
            Vec::new(),
            "0xaaaa",
            &open_flag(),
        )
        .unwrap();

        assert!(block.meets_difficulty());
        assert_eq!(block.index, 1);
        assert_eq!(block.transactions.len(), 1);

        // The committed root matches a fresh recomputation.
        let digest = block.header_digest();
        let root = MerkleTree::compute(&digest, &block.transactions)
            .unwrap()
            .root();
        assert_eq!(block.merkle_root, root.to_vec());
        assert_eq!(block.hash, block::hash_from_root(&root).to_vec());
    }

    #[test]
    fn test_cancel_aborts_search() {
        let cancelled = AtomicBool::new(true);
        let result = mine_block(
            // Unattainable target: only cancellation can end the search.
            MiningTarget {
                previous_hash: vec![7u8; 32],
                index: 1,
                difficulty: BigUint::default(),
            },
            Vec::new(),
            "0xaaaa",
            &cancelled,
        );

        assert!(matches!(result, Err(MiningError::Cancelled)));
    }

    #[test]
    fn test_mine_next_extends_chain() {
        // Chain at length 1, empty mempool: the mined block carries exactly
        // the coinbase and passes the verified append path.
        let secret = SecretKey::new(&mut OsRng);
        let address = keys::address_from_secret(&secret);
        let chain = Arc::new(Chain::new());
        chain.init_genesis(&address).unwrap();
        let mempool = Arc::new(Mempool::new());

        let miner = Miner::new(Arc::clone(&chain), Arc::clone(&mempool));
        let block = miner.mine_next(&address).unwrap();

        assert_eq!(block.transactions.len(), 1);
        assert_eq!(
            block.transactions[0].amount,
            BigUint::from(params::BASE_BLOCK_REWARD)
        );

        chain.try_extend(&block).unwrap();
        assert_eq!(chain.len(), 2);
    }
}
