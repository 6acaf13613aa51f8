//! Credential verifier.
//!
//! Argon2id password hashing plus the email/password check performed at login.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};
use thiserror::Error;

use crate::{
    config::AppConfig,
    models::UserRecord,
    repository::{Repository, RepositoryError},
};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("email and password are required")]
    Missing,

    #[error("no account for this email")]
    UnknownEmail,

    #[error("password does not match")]
    WrongPassword,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// PasswordHasher
///
/// Argon2id with configurable cost. Produces PHC strings, which embed the salt
/// and parameters, so verification needs nothing but the stored hash.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, CredentialError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, CredentialError> {
        Self::new(config.password_memory_kib, config.password_iterations)
    }

    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    /// Returns `Ok(false)` on mismatch; errors only when the stored hash is unreadable.
    pub fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| CredentialError::Hashing(format!("stored hash is malformed: {e}")))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// verify
///
/// Looks up the account by exact email and checks the password against its hash.
/// Soft-deleted accounts cannot log in.
pub async fn verify(
    repo: &dyn Repository,
    hasher: &PasswordHasher,
    email: &str,
    password: &str,
) -> Result<UserRecord, CredentialError> {
    if email.is_empty() || password.is_empty() {
        return Err(CredentialError::Missing);
    }

    let user = repo
        .find_user_by_email(email)
        .await?
        .ok_or(CredentialError::UnknownEmail)?;

    if hasher.verify(password, &user.password_hash)? {
        Ok(user)
    } else {
        Err(CredentialError::WrongPassword)
    }
}
