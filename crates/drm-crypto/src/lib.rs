pub mod hash;
pub mod seal;
pub mod signature;

use thiserror::Error;

/// Core cryptographic errors encountered by the registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CryptoError {
    #[error("invalid key encoding: {0}")]
    InvalidKey(String),
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),
    #[error("seal/unseal failure: {0}")]
    Seal(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;

pub use hash::{sha256_bytes, sha256_hex};
pub use signature::{sign_digest, verify_digest, Identity, KeyPair};
