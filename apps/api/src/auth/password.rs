//! Password hashing: SHA-256 pre-hash, then salted Argon2id.
//!
//! The pre-hash feeds the adaptive hash a fixed 64-character hex string, so
//! arbitrarily long passwords are never truncated by the underlying scheme.

use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};
use tracing::error;

fn pre_hash(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Returns the PHC-formatted hash string for storage.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(pre_hash(password).as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!("Failed to hash password: {}", e)
        })?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!("Invalid password hash: {}", e)
    })?;
    Ok(Argon2::default()
        .verify_password(pre_hash(password).as_bytes(), &parsed)
        .is_ok())
}
