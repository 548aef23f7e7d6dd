#[derive(thiserror::Error, Debug)]
pub enum WalletError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("seal error: {0}")]
    Seal(#[from] drm_crypto::CryptoError),
    #[error("key directory I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WalletError>;
