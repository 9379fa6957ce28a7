//! # galena-tests
//!
//! Integration tests for the Galena node:
//! - End-to-end scenario tests over the chain, miner, and gossip handler
//! - Property-based tests for the serialization and commitment invariants
//!
//! The [`generators`] module builds deterministic keys, funded chains, and
//! sealed blocks; [`harness`] wires full in-process nodes over a shared
//! gossip hub.

pub mod generators;
pub mod harness;

#[cfg(test)]
mod chain_tests;


#[cfg(test)]
mod sync_tests;
