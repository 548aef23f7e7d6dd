use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("failed to build libp2p transport: {0}")]
    Transport(String),
    #[error("failed to join topic {0}")]
    Join(String),
    #[error("publish failed: {0}")]
    Publish(String),
}

pub type Result<T> = std::result::Result<T, NetworkError>;
