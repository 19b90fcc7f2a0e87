//! Password hashing and verification
//!
//! The only place where argon2 is touched. `hash` produces a salted
//! argon2id PHC string; `verify` checks a candidate by recomputation.
//! Plaintext passwords never leave this module's callers.

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};

/// Hash a plaintext password with a freshly generated per-record salt
pub fn hash(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Verify a plaintext candidate against a stored PHC hash
pub fn verify(plain: &str, stored_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    let argon2 = Argon2::default();
    Ok(argon2.verify_password(plain.as_bytes(), &parsed_hash).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash("Secret123").unwrap();
        assert!(verify("Secret123", &hashed).unwrap());
    }

    #[test]
    fn test_wrong_password_fails() {
        let hashed = hash("Secret123").unwrap();
        assert!(!verify("Secret124", &hashed).unwrap());
    }

    #[test]
    fn test_salt_is_per_record() {
        let first = hash("Secret123").unwrap();
        let second = hash("Secret123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify("Secret123", "not-a-phc-string").is_err());
    }
}
