//! Argon2id credential hashing.
//!
//! The salt is generated per hash and embedded in the PHC output string, so
//! callers never handle it separately. Verification goes through the argon2
//! crate's comparison, which does not leak match position timing.

use anyhow::Result;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

use crate::config::SecurityConfig;

const TEMP_PASSWORD_LEN: usize = 8;
const TEMP_PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Hash a password with the cost parameters from `SecurityConfig`.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash string.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate the short uppercase temporary password handed out by the
/// forgot-password flow. Ambiguous characters (0/O, 1/I) are excluded.
#[must_use]
pub fn generate_temp_password() -> String {
    let mut rng = rand::rng();
    (0..TEMP_PASSWORD_LEN)
        .map(|_| {
            let idx = rng.random_range(0..TEMP_PASSWORD_ALPHABET.len());
            TEMP_PASSWORD_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> SecurityConfig {
        SecurityConfig {
            // Minimal cost so the test suite stays fast.
            argon2_memory_cost_kib: 512,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let config = fast_config();
        let hash = hash_password("s3cret", &config).unwrap();

        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("S3cret", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let config = fast_config();

        let a = hash_password("same password", &config).unwrap();
        let b = hash_password("same password", &config).unwrap();

        assert_ne!(a, b);
        assert!(verify_password("same password", &a).unwrap());
        assert!(verify_password("same password", &b).unwrap());
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(verify_password("whatever", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_temp_password_shape() {
        let pw = generate_temp_password();
        assert_eq!(pw.len(), TEMP_PASSWORD_LEN);
        assert!(pw.bytes().all(|b| TEMP_PASSWORD_ALPHABET.contains(&b)));

        // Two draws colliding is astronomically unlikely.
        assert_ne!(generate_temp_password(), generate_temp_password());
    }
}
