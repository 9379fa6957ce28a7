//! # galena-wallet
//!
//! Hierarchical-deterministic keys for the Galena node: BIP-39 mnemonic →
//! BIP-32 master key → per-index child keys on the `m/44'/60'/0'/0/{index}`
//! path, plus Base58 master-key file persistence. The chain core never
//! touches this crate; the shell consumes it to sign transactions.

mod keystore;

pub use bip32::XPrv;
pub use keystore::{derive_key, generate_master, load_master, save_master};

use thiserror::Error;

/// Wallet errors.
#[derive(Error, Debug)]
pub enum WalletError {
    /// BIP-32/39 derivation failure.
    #[error("key derivation error: {0}")]
    Derivation(String),

    /// Derived bytes are not a valid secp256k1 secret key.
    #[error("invalid key material: {0}")]
    Key(#[from] secp256k1::Error),

    /// Master-key file I/O failure.
    #[error("master key I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;
