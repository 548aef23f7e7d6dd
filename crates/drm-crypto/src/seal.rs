//! Symmetric sealing of private key material at rest.
//!
//! Mirrors the original program's use of NaCl `secretbox`: a random
//! 24-byte nonce is prefixed to the ciphertext. `XChaCha20Poly1305` is the
//! RustCrypto equivalent with the same 24-byte nonce width.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand_core::{OsRng, RngCore};

use crate::{CryptoError, Result};

pub const NONCE_LEN: usize = 24;
pub const WRAP_KEY_LEN: usize = 32;

/// Generate a fresh 32-byte wrapping key (the process-local secret persisted
/// on first run under `<key_dir>/.wrap_key`).
pub fn generate_wrap_key() -> [u8; WRAP_KEY_LEN] {
    let mut key = [0u8; WRAP_KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

/// Seal `plaintext` under `wrap_key`, returning `nonce || ciphertext`.
pub fn seal(wrap_key: &[u8; WRAP_KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(wrap_key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Seal(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a blob produced by [`seal`].
pub fn unseal(wrap_key: &[u8; WRAP_KEY_LEN], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN {
        return Err(CryptoError::Seal("sealed blob shorter than nonce".into()));
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(wrap_key));
    let nonce = XNonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::Seal(e.to_string()))
}
