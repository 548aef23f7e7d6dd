#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("database already open for this directory: {0}")]
    AlreadyOpen(String),
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;
