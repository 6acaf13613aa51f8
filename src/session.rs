//! Session token manager.
//!
//! Issues, decodes and refreshes the HS256-signed token that carries a user's
//! identity claims between requests. Nothing is stored server-side: a token stays
//! valid until its `exp`, whatever happens to the account in the meantime.

use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    models::{Role, SessionUpdateRequest, SessionUser, UserRecord},
};

/// Name of the cookie that carries the session token for browser clients.
pub const SESSION_COOKIE: &str = "fitcoach_session";

/// Claims
///
/// Payload signed into every session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id. Fixed at issuance.
    pub sub: Uuid,
    /// Fixed at issuance; never refreshed.
    pub role: Role,
    pub name: String,
    pub email: String,
    pub username: String,
    /// Issued at (Unix seconds).
    pub iat: u64,
    /// Expiration (Unix seconds).
    pub exp: u64,
}

impl Claims {
    pub fn user(&self) -> SessionUser {
        SessionUser {
            id: self.sub,
            name: self.name.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to sign session token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("session token has expired")]
    Expired,

    #[error("session token is invalid")]
    Invalid,

    #[error("system time error: {0}")]
    Clock(#[from] SystemTimeError),
}

/// SessionManager
///
/// Holds the signing keys derived from the process-wide secret. Cheap to clone and
/// shared through `AppState`.
#[derive(Clone)]
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl SessionManager {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.auth_secret, config.session_ttl_secs)
    }

    /// issue
    ///
    /// Snapshots the user's identity into a freshly signed token.
    pub fn issue(&self, user: &UserRecord) -> Result<(String, Claims), SessionError> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let claims = Claims {
            sub: user.id,
            role: user.role,
            name: user.name.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        let token = self.sign(&claims)?;
        Ok((token, claims))
    }

    /// decode
    ///
    /// Verifies signature and expiry and returns the embedded claims.
    pub fn decode(&self, token: &str) -> Result<Claims, SessionError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid,
            })
    }

    /// refresh
    ///
    /// Re-signs a valid token with updated display claims. `sub`, `role`, `iat` and
    /// `exp` are carried over untouched, so a refresh never extends a session.
    pub fn refresh(
        &self,
        token: &str,
        update: &SessionUpdateRequest,
    ) -> Result<(String, Claims), SessionError> {
        let mut claims = self.decode(token)?;

        if let Some(name) = &update.name {
            claims.name = name.clone();
        }
        if let Some(email) = &update.email {
            claims.email = email.clone();
        }
        if let Some(username) = &update.username {
            claims.username = username.clone();
        }

        let token = self.sign(&claims)?;
        Ok((token, claims))
    }

    fn sign(&self, claims: &Claims) -> Result<String, SessionError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }
}
