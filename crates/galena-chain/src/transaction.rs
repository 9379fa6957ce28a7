//! Signed value-transfer transactions.

use crate::error::{ChainResult, ValidationError};
use crate::{keys, params};
use num_bigint::BigUint;
use secp256k1::SecretKey;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A value transfer, immutable once signed.
///
/// The struct declaration order is the canonical JSON field order; the
/// signing pre-image is the same encoding with `signature` forced to null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender address, or [`params::COINBASE_SENDER`] for miner rewards.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Transferred amount.
    #[serde(with = "crate::encoding::biguint_decimal")]
    pub amount: BigUint,
    /// Per-sender monotonic nonce.
    pub nonce: u64,
    /// Fee offered to the miner.
    #[serde(with = "crate::encoding::biguint_decimal")]
    pub price: BigUint,
    /// 65-byte recoverable signature; absent on coinbase transactions.
    #[serde(with = "crate::encoding::option_hex")]
    pub signature: Option<Vec<u8>>,
}

impl Transaction {
    /// Build and sign a transfer from the holder of `secret_key`.
    pub fn create(
        secret_key: &SecretKey,
        to: &str,
        amount: BigUint,
        price: BigUint,
        nonce: u64,
    ) -> ChainResult<Self> {
        let mut tx = Self {
            from: keys::address_from_secret(secret_key),
            to: to.to_string(),
            amount,
            nonce,
            price,
            signature: None,
        };

        let digest = tx.hash()?;
        tx.signature = Some(keys::sign_digest(&digest, secret_key));

        debug!(
            from = %tx.from,
            to = %tx.to,
            amount = %tx.amount,
            price = %tx.price,
            nonce = tx.nonce,
            "transaction signed"
        );

        Ok(tx)
    }

    /// Build a miner-reward transaction. Carries no signature.
    pub fn coinbase(to: &str, amount: BigUint, nonce: u64) -> Self {
        Self {
            from: params::COINBASE_SENDER.to_string(),
            to: to.to_string(),
            amount,
            nonce,
            price: BigUint::default(),
            signature: None,
        }
    }

    /// Whether this is a miner-reward transaction.
    pub fn is_coinbase(&self) -> bool {
        self.from == params::COINBASE_SENDER
    }

    /// Canonical byte encoding, signature included.
    pub fn canonical_bytes(&self) -> ChainResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Keccak-256 over the signature-stripped canonical encoding.
    ///
    /// This is both the signing pre-image and the de-duplication key used
    /// by balance accounting.
    pub fn hash(&self) -> ChainResult<[u8; 32]> {
        let mut unsigned = self.clone();
        unsigned.signature = None;
        Ok(keys::keccak256(&serde_json::to_vec(&unsigned)?))
    }

    /// Check that the signature recovers the declared sender.
    ///
    /// Coinbase transactions pass unconditionally. Address comparison is
    /// case-insensitive.
    pub fn verify_signature(&self) -> Result<(), ValidationError> {
        if self.is_coinbase() {
            return Ok(());
        }

        let signature = self
            .signature
            .as_deref()
            .ok_or(ValidationError::MissingSignature)?;
        let digest = self
            .hash()
            .map_err(|e| ValidationError::Encoding(e.to_string()))?;
        let recovered = keys::recover_address(&digest, signature)?;

        if recovered.eq_ignore_ascii_case(&self.from) {
            Ok(())
        } else {
            Err(ValidationError::AddressMismatch {
                recovered,
                declared: self.from.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn signed_transfer(nonce: u64) -> (SecretKey, Transaction) {
        let secret = SecretKey::new(&mut OsRng);
        let tx = Transaction::create(
            &secret,
            "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
            BigUint::from(10u32),
            BigUint::from(1u32),
            nonce,
        )
        .unwrap();
        (secret, tx)
    }

    #[test]
    fn test_create_and_verify() {
        let (secret, tx) = signed_transfer(0);

        assert_eq!(tx.from, keys::address_from_secret(&secret));
        assert_eq!(tx.signature.as_ref().unwrap().len(), 65);
        tx.verify_signature().unwrap();
    }

    #[test]
    fn test_tampered_amount_fails_verification() {
        let (_, mut tx) = signed_transfer(0);
        tx.amount = BigUint::from(999u32);

        assert!(matches!(
            tx.verify_signature(),
            Err(ValidationError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn test_coinbase_passes_unconditionally() {
        let coinbase = Transaction::coinbase("0xaaaa", BigUint::from(100u32), 7);

        assert!(coinbase.is_coinbase());
        assert!(coinbase.signature.is_none());
        coinbase.verify_signature().unwrap();
    }

    #[test]
    fn test_missing_signature_rejected() {
        let (_, mut tx) = signed_transfer(0);
        tx.signature = None;

        assert!(matches!(
            tx.verify_signature(),
            Err(ValidationError::MissingSignature)
        ));
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let (_, mut tx) = signed_transfer(0);
        if let Some(sig) = tx.signature.as_mut() {
            sig.truncate(64);
        }

        assert!(matches!(
            tx.verify_signature(),
            Err(ValidationError::SignatureLength { len: 64 })
        ));
    }

    #[test]
    fn test_canonical_encoding_is_pinned() {
        // The exact byte form is a wire contract: field order, decimal
        // strings for big integers, null signature on coinbase.
        let coinbase = Transaction::coinbase("0xabc", BigUint::from(1000u32), 0);
        let encoded = String::from_utf8(coinbase.canonical_bytes().unwrap()).unwrap();

        assert_eq!(
            encoded,
            r#"{"from":"COINBASE","to":"0xabc","amount":"1000","nonce":0,"price":"0","signature":null}"#
        );
    }

    #[test]
    fn test_hash_ignores_signature() {
        let (_, tx) = signed_transfer(3);
        let mut unsigned = tx.clone();
        unsigned.signature = None;

        assert_eq!(tx.hash().unwrap(), unsigned.hash().unwrap());
    }

    #[test]
    fn test_serde_round_trip() {
        let (_, tx) = signed_transfer(5);
        let bytes = tx.canonical_bytes().unwrap();
        let decoded: Transaction = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(decoded, tx);
    }
}
