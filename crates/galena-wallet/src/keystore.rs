//! Master key generation, persistence, and child derivation.

use crate::{WalletError, WalletResult};
use bip32::{ChildNumber, Mnemonic, Prefix, XPrv};
use galena_chain::keys;
use rand::rngs::OsRng;
use secp256k1::SecretKey;
use std::path::{Path, PathBuf};
use tracing::info;

/// BIP-44 purpose level.
const PURPOSE: u32 = 44;

/// Coin type of the derivation path.
const COIN_TYPE: u32 = 60;

fn derivation_error(e: bip32::Error) -> WalletError {
    WalletError::Derivation(e.to_string())
}

/// Generate a fresh mnemonic and master key.
///
/// Returns the phrase for operator display; it is the only recovery path
/// for the master key.
pub fn generate_master() -> WalletResult<(String, XPrv)> {
    let mnemonic = Mnemonic::random(&mut OsRng, Default::default());
    let seed = mnemonic.to_seed("");
    let master = XPrv::new(&seed).map_err(derivation_error)?;

    info!("master key generated");
    Ok((mnemonic.phrase().to_string(), master))
}

fn master_file(path: &Path) -> PathBuf {
    let mut file = path.as_os_str().to_owned();
    file.push(".master");
    PathBuf::from(file)
}

/// Write the master key to `<path>.master` as a Base58 `xprv` string.
pub fn save_master(path: &Path, master: &XPrv) -> WalletResult<()> {
    let serialized = master.to_string(Prefix::XPRV);
    let file = master_file(path);
    std::fs::write(&file, serialized.as_bytes())?;

    info!(file = %file.display(), "master key saved");
    Ok(())
}

/// Restore the master key from `<path>.master`.
pub fn load_master(path: &Path) -> WalletResult<XPrv> {
    let file = master_file(path);
    let data = std::fs::read_to_string(&file)?;
    let master: XPrv = data.trim().parse().map_err(derivation_error)?;

    info!(file = %file.display(), "master key loaded");
    Ok(master)
}

/// Derive the key at `m/44'/60'/0'/0/{index}` and its address.
pub fn derive_key(master: &XPrv, index: u32) -> WalletResult<(SecretKey, String)> {
    let child = master
        .derive_child(ChildNumber::new(PURPOSE, true).map_err(derivation_error)?)
        .map_err(derivation_error)?
        .derive_child(ChildNumber::new(COIN_TYPE, true).map_err(derivation_error)?)
        .map_err(derivation_error)?
        .derive_child(ChildNumber::new(0, true).map_err(derivation_error)?)
        .map_err(derivation_error)?
        .derive_child(ChildNumber::new(0, false).map_err(derivation_error)?)
        .map_err(derivation_error)?
        .derive_child(ChildNumber::new(index, false).map_err(derivation_error)?)
        .map_err(derivation_error)?;

    let secret = SecretKey::from_slice(child.private_key().to_bytes().as_slice())?;
    let address = keys::address_from_secret(&secret);
    Ok((secret, address))
}
