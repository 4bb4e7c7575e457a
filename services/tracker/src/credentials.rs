//! Password hashing and verification

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use tracing::error;

use crate::error::{TrackerError, TrackerResult};

/// Hash a password into a PHC string with a fresh random salt
pub fn hash_password(password: &str) -> TrackerResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            TrackerError::Internal
        })?
        .to_string();

    Ok(hash)
}

/// Check a password against a stored PHC hash
pub fn verify_password(password_hash: &str, password: &str) -> TrackerResult<()> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| {
        error!("Failed to parse stored password hash: {}", e);
        TrackerError::Internal
    })?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| TrackerError::InvalidCredential)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse").is_ok());
        assert!(matches!(
            verify_password(&hash, "battery staple"),
            Err(TrackerError::InvalidCredential)
        ));
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("pw").unwrap(), hash_password("pw").unwrap());
    }

    #[test]
    fn corrupt_hash_is_internal_error() {
        assert!(matches!(
            verify_password("not-a-phc-string", "pw"),
            Err(TrackerError::Internal)
        ));
    }
}
