//! secp256k1 keys, Keccak-derived addresses, recoverable signatures.

use crate::error::ValidationError;
use crate::params;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Address of a public key: `0x` plus the lowercase hex of the rightmost
/// 20 bytes of Keccak-256 over the 64-byte uncompressed key body.
pub fn address_from_public(public_key: &PublicKey) -> String {
    let uncompressed = public_key.serialize_uncompressed();
    let digest = keccak256(&uncompressed[1..]);
    format!("0x{}", hex::encode(&digest[32 - params::ADDRESS_BYTES..]))
}

/// Address of the public key belonging to a secret key.
pub fn address_from_secret(secret_key: &SecretKey) -> String {
    let secp = Secp256k1::new();
    address_from_public(&PublicKey::from_secret_key(&secp, secret_key))
}

/// Sign a 32-byte digest, producing the 65-byte `[r ‖ s ‖ v]` form.
pub fn sign_digest(digest: &[u8; 32], secret_key: &SecretKey) -> Vec<u8> {
    let secp = Secp256k1::new();
    let message = Message::from_digest(*digest);
    let (recovery_id, compact) = secp
        .sign_ecdsa_recoverable(&message, secret_key)
        .serialize_compact();

    let mut signature = Vec::with_capacity(params::SIGNATURE_BYTES);
    signature.extend_from_slice(&compact);
    signature.push(recovery_id.to_i32() as u8);
    signature
}

/// Recover the signer address of a 65-byte signature over a digest.
pub fn recover_address(digest: &[u8; 32], signature: &[u8]) -> Result<String, ValidationError> {
    if signature.len() != params::SIGNATURE_BYTES {
        return Err(ValidationError::SignatureLength {
            len: signature.len(),
        });
    }

    let recovery_id = RecoveryId::from_i32(i32::from(signature[64]))
        .map_err(|e| ValidationError::Recovery(e.to_string()))?;
    let recoverable = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(|e| ValidationError::Recovery(e.to_string()))?;

    let secp = Secp256k1::new();
    let message = Message::from_digest(*digest);
    let public_key = secp
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| ValidationError::Recovery(e.to_string()))?;

    Ok(address_from_public(&public_key))
}
