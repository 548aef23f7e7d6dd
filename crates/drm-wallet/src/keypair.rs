use std::fs;
use std::path::{Path, PathBuf};

use drm_crypto::seal::{self, WRAP_KEY_LEN};
use drm_crypto::{Identity, KeyPair as RawKeyPair};

use crate::errors::{Result, WalletError};

const PRIVATE_KEY_FILE: &str = ".private_key";
const PUBLIC_KEY_FILE: &str = ".public_key";
const WRAP_KEY_FILE: &str = ".wrap_key";

/// A node's signing identity, sealed at rest under `key_dir`.
///
/// The core consensus/ledger code never touches sealed bytes directly; it
/// only asks a `Wallet` to sign a digest or report its public `Identity`.
pub struct Wallet {
    key_dir: PathBuf,
    key_pair: RawKeyPair,
}

impl Wallet {
    /// Load the key pair sealed under `key_dir`, generating and sealing a
    /// fresh one on first run.
    pub fn load_or_create(key_dir: impl AsRef<Path>) -> Result<Self> {
        let key_dir = key_dir.as_ref().to_path_buf();
        fs::create_dir_all(&key_dir)?;

        let private_path = key_dir.join(PRIVATE_KEY_FILE);
        let key_pair = if private_path.exists() {
            Self::load(&key_dir)?
        } else {
            Self::generate_and_save(&key_dir)?
        };

        Ok(Self { key_dir, key_pair })
    }

    fn wrap_key(key_dir: &Path) -> Result<[u8; WRAP_KEY_LEN]> {
        let path = key_dir.join(WRAP_KEY_FILE);
        if path.exists() {
            let raw = fs::read(&path)?;
            raw.try_into()
                .map_err(|_| WalletError::InvalidKey("wrap key file has wrong length".into()))
        } else {
            let key = seal::generate_wrap_key();
            fs::write(&path, key)?;
            Ok(key)
        }
    }

    fn generate_and_save(key_dir: &Path) -> Result<RawKeyPair> {
        let key_pair = RawKeyPair::generate();
        let wrap_key = Self::wrap_key(key_dir)?;
        let sealed = seal::seal(&wrap_key, &key_pair.to_scalar_bytes())?;

        fs::write(key_dir.join(PRIVATE_KEY_FILE), sealed)?;
        fs::write(key_dir.join(PUBLIC_KEY_FILE), key_pair.identity())?;
        Ok(key_pair)
    }

    fn load(key_dir: &Path) -> Result<RawKeyPair> {
        let wrap_key = Self::wrap_key(key_dir)?;
        let sealed = fs::read(key_dir.join(PRIVATE_KEY_FILE))?;
        let scalar = seal::unseal(&wrap_key, &sealed)?;
        Ok(RawKeyPair::from_scalar_bytes(&scalar)?)
    }

    pub fn identity(&self) -> Identity {
        self.key_pair.identity()
    }

    pub fn sign_digest(&self, digest: &[u8; 32]) -> String {
        self.key_pair.sign_digest(digest)
    }

    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_and_reloads_same_identity() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = Wallet::load_or_create(dir.path()).unwrap();
        let identity = wallet.identity();
        drop(wallet);

        let reloaded = Wallet::load_or_create(dir.path()).unwrap();
        assert_eq!(reloaded.identity(), identity);
    }

    #[test]
    fn sign_digest_verifies_under_identity() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = Wallet::load_or_create(dir.path()).unwrap();
        let digest = [3u8; 32];
        let sig = wallet.sign_digest(&digest);
        assert!(drm_crypto::verify_digest(&wallet.identity(), &digest, &sig));
    }
}
