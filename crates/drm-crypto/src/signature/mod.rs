mod keypair;

pub use keypair::{sign_digest, verify_digest, Identity, KeyPair};
