use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use uuid::Uuid;

use crate::account::Credentials;
use crate::errors::BackendError;

/// Hashes a password with argon2id and a fresh random salt. The result is
/// a PHC string carrying the parameters and the salt.
pub fn hash_password(password: &str) -> Result<Credentials, BackendError> {
    let salt = SaltString::b64_encode(Uuid::new_v4().as_bytes())
        .map_err(|e| BackendError::PasswordHash(e.to_string()))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| BackendError::PasswordHash(e.to_string()))?
        .to_string();

    Ok(Credentials { hash })
}

/// A stored hash that cannot be parsed never verifies.
pub fn verify_password(credentials: &Credentials, password: &str) -> bool {
    match PasswordHash::new(&credentials.hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwords_verify_against_their_own_hash() {
        let credentials = hash_password("oss").unwrap();

        assert!(verify_password(&credentials, "oss"));
        assert!(!verify_password(&credentials, "OSS"));
        assert!(credentials.hash.starts_with("$argon2id$"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let first = hash_password("same").unwrap();
        let second = hash_password("same").unwrap();

        assert_ne!(first.hash, second.hash);
        assert!(verify_password(&second, "same"));
    }

    #[test]
    fn unreadable_hashes_never_verify() {
        let credentials = Credentials {
            hash: "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8".to_owned(),
        };

        assert!(!verify_password(&credentials, "password"));
    }
}
