mod errors;
mod keypair;

pub use errors::{Result, WalletError};
pub use keypair::Wallet;
