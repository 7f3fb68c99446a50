//! Password hashing and verification
//!
//! Argon2id in PHC format. Hashing is CPU-bound, so it runs on the blocking
//! pool instead of the request task.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;

use crate::error::{NihongoError, Result};

#[async_trait]
pub trait PasswordService: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<String>;

    /// `Ok(false)` on mismatch; `Err` only when the stored digest is unusable
    async fn verify(&self, plaintext: &str, digest: &str) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct Argon2PasswordService {
    params: Params,
}

impl Argon2PasswordService {
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Cheap parameters so test suites do not spend seconds per hash
    pub fn for_testing() -> Self {
        let params = Params::new(Params::MIN_M_COST, 1, 1, None).unwrap_or_default();
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_with(argon2: &Argon2<'_>, plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| NihongoError::PasswordHashError(format!("password hash failed: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_with(argon2: &Argon2<'_>, plaintext: &str, digest: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(digest)
        .map_err(|e| NihongoError::PasswordHashError(format!("invalid password hash: {}", e)))?;

    match argon2.verify_password(plaintext.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(NihongoError::PasswordHashError(format!(
            "password verification failed: {}",
            e
        ))),
    }
}

#[async_trait]
impl PasswordService for Argon2PasswordService {
    async fn hash(&self, plaintext: &str) -> Result<String> {
        let argon2 = self.argon2();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hash_with(&argon2, &plaintext)).await?
    }

    async fn verify(&self, plaintext: &str, digest: &str) -> Result<bool> {
        let argon2 = self.argon2();
        let plaintext = plaintext.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || verify_with(&argon2, &plaintext, &digest)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_is_salted_phc() {
        let service = Argon2PasswordService::for_testing();
        let hash = service.hash("senha123").await.unwrap();
        assert!(hash.starts_with("$argon2id$"));

        let hash2 = service.hash("senha123").await.unwrap();
        assert_ne!(hash, hash2);
    }

    #[tokio::test]
    async fn test_verify() {
        let service = Argon2PasswordService::for_testing();
        let hash = service.hash("senha123").await.unwrap();
        assert!(service.verify("senha123", &hash).await.unwrap());
        assert!(!service.verify("senha456", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_garbage_digest() {
        let service = Argon2PasswordService::for_testing();
        assert!(service.verify("senha123", "not-a-hash").await.is_err());
    }
}
