pub mod block;
pub mod chain;
pub mod error;
pub mod transaction;

pub use block::Block;
pub use chain::Ledger;
pub use error::{BlockchainError, Result};
pub use transaction::{generate_tx_id, Transaction, TxId, TxType};
