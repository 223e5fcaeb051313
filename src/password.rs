//! Password hashing and verification.
//!
//! Passwords are hashed with Argon2id (default OWASP parameters) and stored as
//! PHC strings, so the salt and parameters travel with the hash.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use thiserror::Error;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
}

/// Rejects passwords shorter than [`MIN_PASSWORD_LENGTH`] Unicode code points.
pub fn check_policy(raw: &str) -> Result<(), PasswordError> {
    let actual = raw.chars().count();
    if actual < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort {
            min: MIN_PASSWORD_LENGTH,
            actual,
        });
    }
    Ok(())
}

/// Hash a clear-text password into a PHC string.
pub fn hash_password(raw: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Verify a clear-text password against a stored PHC string.
///
/// A malformed stored hash verifies as `false` rather than erroring.
pub fn verify_password(raw: &str, phc: &str) -> bool {
    let parsed = match PasswordHash::new(phc) {
        Ok(h) => h,
        Err(_) => return false,
    };

    // Argon2 compares in constant time internally
    Argon2::default()
        .verify_password(raw.as_bytes(), &parsed)
        .is_ok()
}
