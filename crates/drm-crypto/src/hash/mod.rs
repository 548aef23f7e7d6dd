mod sha256;

pub use sha256::{sha256_bytes, sha256_hex};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        let hash = sha256_hex(b"hello world");
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde"
        );
    }

    #[test]
    fn differs_by_input() {
        assert_ne!(sha256_hex(b"a"), sha256_hex(b"b"));
    }
}
