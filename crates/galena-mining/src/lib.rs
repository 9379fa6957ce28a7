//! # galena-mining
//!
//! Proof-of-work block production: coinbase assembly, body ordering, and
//! the nonce search. The search is a tight CPU loop; run it on a blocking
//! thread and stop it through the cancel flag.

mod miner;

pub use miner::{assemble, mine_block, Miner, MiningError, MiningResult};
