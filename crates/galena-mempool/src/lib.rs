//! # galena-mempool
//!
//! The pending transaction set of the Galena node: admitted, not-yet-
//! confirmed transfers keyed by their signature bytes, orderable by offered
//! fee for block assembly.

mod pool;

pub use pool::Mempool;
