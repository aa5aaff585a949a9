//! Argon2id password hashing.
//!
//! Hashing and verification are CPU-bound, so both run on tokio's
//! blocking pool instead of stalling request workers.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use super::AuthError;
use crate::config::PasswordHashConfig;

/// Salted, parameterized password hasher.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Build a hasher with the configured cost.
    ///
    /// # Errors
    ///
    /// Returns the argon2 error message if the parameters are out of range.
    pub fn new(config: &PasswordHashConfig) -> Result<Self, String> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| e.to_string())?;
        Ok(Self { params })
    }

    /// Hash a plaintext password into a PHC string with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if hashing fails.
    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let params = self.params.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await
        .map_err(|_| AuthError::PasswordHash)?
        .map_err(|_| AuthError::PasswordHash)
    }

    /// Check a plaintext password against a stored digest.
    ///
    /// Cost parameters are read from the digest, so hashes made under an older
    /// configuration keep verifying. A digest that does not parse never matches.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` only if the blocking task fails.
    pub async fn verify(&self, password: &str, digest: &str) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let digest = digest.to_owned();

        tokio::task::spawn_blocking(move || {
            PasswordHash::new(&digest).is_ok_and(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
        })
        .await
        .map_err(|_| AuthError::PasswordHash)
    }
}
