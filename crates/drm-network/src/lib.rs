pub mod behaviour;
pub mod envelope;
pub mod errors;
pub mod node;

pub use envelope::Envelope;
pub use errors::{NetworkError, Result};
pub use node::{GossipNode, TRANSACTIONS_TOPIC, VOTE_TOPIC};
