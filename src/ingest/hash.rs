//! Content hashing for uploads.
//!
//! The SHA-256 of the raw upload bytes is stored on each import so that
//! repeated uploads of the same file can be recognized.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hex digest of an upload.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_deterministic() {
        let a = content_hash(b"id,name\n1,x\n");
        let b = content_hash(b"id,name\n1,x\n");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_content_hash_differs() {
        assert_ne!(content_hash(b"id\n1\n"), content_hash(b"id\n2\n"));
    }

    #[test]
    fn test_content_hash_known_value() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
