use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::Role,
    session::{Claims, SESSION_COOKIE, SessionManager},
};

/// Pulls the raw session token from a request: the `Authorization: Bearer`
/// header wins, the session cookie is the fallback for browser clients.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Session Extractor Result
///
/// The raw token together with its verified claims. Used by the session
/// endpoints, which need the token itself to refresh it.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: Claims,
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionManager: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionManager::from_ref(state);

        let token = token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;

        let claims = sessions.decode(&token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            AppError::from(e)
        })?;

        Ok(Session { token, claims })
    }
}

/// AuthUser Extractor Result
///
/// The acting identity of an authenticated request, threaded explicitly into
/// every service call. Built from the token claims alone: no storage is touched
/// to authenticate a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}

impl From<&Claims> for AuthUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Rejects with a JSON 401 when the token is missing, malformed, badly signed
/// or expired.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionManager: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        Ok(AuthUser::from(&session.claims))
    }
}

/// auth_middleware
///
/// Layered over the authenticated routes. Extracting `AuthUser` is the whole
/// check: a rejection short-circuits the request before any handler runs.
pub async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}
