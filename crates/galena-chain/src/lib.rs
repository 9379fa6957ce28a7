//! # galena-chain
//!
//! Core ledger types and the chain state machine for the Galena node.
//!
//! This crate provides:
//! - Signed value-transfer transactions with recoverable ECDSA signatures
//! - Merkle commitment of block contents
//! - Proof-of-work blocks and the difficulty retargeting rule
//! - The canonical `Chain` with balance/nonce accounting, block
//!   verification, whole-chain adoption, and JSON snapshot I/O
//!
//! ## Canonical encoding
//!
//! Transaction hashing and Merkle leaves are computed over the compact
//! `serde_json` encoding of [`Transaction`], fields in declaration order
//! (`from, to, amount, nonce, price, signature`), big integers as decimal
//! strings and binary fields as lowercase hex. Every encode goes through the
//! single serde definition, so identical transactions hash identically on
//! every node.

pub mod block;
pub mod chain;
pub mod difficulty;
pub(crate) mod encoding;
pub mod error;
pub mod keys;
pub mod merkle;
pub mod params;
pub mod transaction;

pub use block::Block;
pub use chain::{genesis_block, Adoption, Chain, MiningTarget};
pub use error::{ChainError, ChainResult, ValidationError};
pub use merkle::MerkleTree;
pub use transaction::Transaction;
