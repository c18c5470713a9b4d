//! SHA-256 integrity digest stored alongside each ciphertext.
//!
//! The digest is computed over the plaintext that was sealed, and recomputed
//! after every decryption. A mismatch means the ciphertext or the stored
//! digest was altered after the write; detection only, there is no repair.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of the exact plaintext bytes.
#[must_use]
pub fn content_digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Recompute the digest and compare against the stored value in constant time.
#[must_use]
pub fn verify_digest(data: &[u8], expected: &str) -> bool {
    constant_time_eq(content_digest(data).as_bytes(), expected.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_hex_sha256() {
        // Known vector for the empty input.
        assert_eq!(
            content_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_digest(b"abc").len(), 64);
    }

    #[test]
    fn test_verify_accepts_matching_digest() {
        let data = b"balance: 1000";
        let digest = content_digest(data);

        assert!(verify_digest(data, &digest));
    }

    #[test]
    fn test_verify_rejects_any_mutation() {
        let data = b"balance: 1000";
        let digest = content_digest(data);

        assert!(!verify_digest(b"balance: 1001", &digest));

        // Flip one nibble of the stored digest.
        let mut corrupted = digest.clone().into_bytes();
        corrupted[0] = if corrupted[0] == b'0' { b'1' } else { b'0' };
        let corrupted = String::from_utf8(corrupted).unwrap();
        assert!(!verify_digest(data, &corrupted));

        // Truncated digest never matches.
        assert!(!verify_digest(data, &digest[..63]));
    }
}
