//! Deterministic test data generators.

use galena_chain::block::{hash_from_root, header_digest};
use galena_chain::{genesis_block, keys, params, Block, MerkleTree, Transaction};
use num_bigint::BigUint;
use num_traits::One;
use secp256k1::SecretKey;

/// Fixed genesis timestamp so both sides of a simulated network build the
/// same genesis block.
pub const GENESIS_TIMESTAMP: i64 = 1_700_000_000;

/// Deterministic secret key from a one-byte seed.
pub fn secret(seed: u8) -> SecretKey {
    SecretKey::from_slice(&[seed.max(1); 32]).expect("static test key material")
}

/// Address of the deterministic key for `seed`.
pub fn address(seed: u8) -> String {
    keys::address_from_secret(&secret(seed))
}

/// A genesis block crediting the deterministic key for `seed`.
pub fn funded_genesis(seed: u8) -> (SecretKey, String, Block) {
    let secret = secret(seed);
    let address = keys::address_from_secret(&secret);
    let genesis = genesis_block(&address, GENESIS_TIMESTAMP).expect("genesis");
    (secret, address, genesis)
}

/// A signed transfer with unit price.
pub fn transfer(secret: &SecretKey, to: &str, amount: u64, nonce: u64) -> Transaction {
    Transaction::create(secret, to, BigUint::from(amount), BigUint::one(), nonce)
        .expect("signing")
}

/// Seal a valid child block without a nonce search.
///
/// The claimed difficulty admits every hash; verification checks the
/// block's committed target, not the retarget schedule, so sealed blocks
/// pass the full verification path.
pub fn seal_block(previous: &Block, txs: Vec<Transaction>, miner: &str) -> Block {
    let index = previous.index + 1;
    let reward: BigUint = txs.iter().map(|tx| tx.price.clone()).sum::<BigUint>()
        + BigUint::from(params::BASE_BLOCK_REWARD);
    let mut body = vec![Transaction::coinbase(miner, reward, index)];
    body.extend(txs);

    let timestamp = previous.timestamp + params::TARGET_BLOCK_INTERVAL_SECS;
    let digest = header_digest(index, &previous.hash, timestamp, miner, 0);
    let root = MerkleTree::compute(&digest, &body).expect("commitment").root();

    Block {
        index,
        previous_hash: previous.hash.clone(),
        timestamp,
        transactions: body,
        miner: miner.to_string(),
        nonce: 0,
        hash: hash_from_root(&root).to_vec(),
        difficulty: BigUint::one() << 256,
        merkle_root: root.to_vec(),
    }
}

/// A sealed chain of `len` blocks starting at `genesis` (inclusive), each
/// subsequent block carrying only its coinbase.
pub fn sealed_chain(genesis: &Block, miner: &str, len: usize) -> Vec<Block> {
    let mut blocks = vec![genesis.clone()];
    while blocks.len() < len {
        let next = seal_block(&blocks[blocks.len() - 1], Vec::new(), miner);
        blocks.push(next);
    }
    blocks
}
