use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("transaction validation failed: {reason}")]
    InvalidTransaction { reason: String },

    #[error("block validation failed: {reason}")]
    InvalidBlock { reason: String },

    #[error("transaction not found: {tx_id}")]
    TransactionNotFound { tx_id: String },

    #[error("invalid chain: {reason}")]
    InvalidChain { reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] drm_storage::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BlockchainError>;
