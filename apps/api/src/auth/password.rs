use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::errors::AppError;

/// Hashes a password into a PHC string (`$argon2id$...`).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("Failed to hash password: {e}"))
}

/// Returns false for a wrong password and for a malformed stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Argon2 is deliberately slow; keep it off the async workers.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(anyhow!("Password hashing task failed: {e}")))?
        .map_err(AppError::Internal)
}

pub async fn verify_password_blocking(password: String, stored_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| AppError::Internal(anyhow!("Password verification task failed: {e}")))
}

/// Throwaway hash checked when a login matches no account, so unknown logins
/// cost the same Argon2 work as a wrong password.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("joba-unknown-login").unwrap_or_default())
}

pub async fn verify_unknown_login_blocking(password: String) -> Result<(), AppError> {
    tokio::task::spawn_blocking(move || {
        verify_password(&password, dummy_hash());
    })
    .await
    .map_err(|e| AppError::Internal(anyhow!("Password verification task failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_phc_string() {
        let hash = hash_password("Str0ng!Pass").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("Str0ng!Pass"));
    }

    #[test]
    fn test_verify_accepts_correct_password() {
        let hash = hash_password("Str0ng!Pass").unwrap();
        assert!(verify_password("Str0ng!Pass", &hash));
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let hash = hash_password("Str0ng!Pass").unwrap();
        assert!(!verify_password("str0ng!pass", &hash));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = hash_password("Str0ng!Pass").unwrap();
        let b = hash_password("Str0ng!Pass").unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_blocking_wrappers_round_trip() {
        let hash = hash_password_blocking("Str0ng!Pass".to_string()).await.unwrap();
        assert!(verify_password_blocking("Str0ng!Pass".to_string(), hash)
            .await
            .unwrap());
    }

    #[test]
    fn test_dummy_hash_is_real_argon2_and_matches_nothing() {
        let hash = dummy_hash();
        assert!(hash.starts_with("$argon2id$"));
        assert!(PasswordHash::new(hash).is_ok());
        assert!(!verify_password("Str0ng!Pass", hash));
        assert_eq!(dummy_hash(), hash);
    }

    #[tokio::test]
    async fn test_unknown_login_check_completes() {
        verify_unknown_login_blocking("Str0ng!Pass".to_string())
            .await
            .unwrap();
    }
}
