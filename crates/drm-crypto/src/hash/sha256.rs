use sha2::{Digest, Sha256};

// takes in a slice of bytes, computes the sha-256 digest and returns the
// raw 32 bytes. finalize() returns a GenericArray<u8, U32>; into() converts
// it to a plain array.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256_bytes(data))
}
