use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    AppState,
    auth::Session,
    credentials,
    error::{AppError, ErrorBody, Result},
    extract::ValidJson,
    models::{LoginRequest, SessionResponse, SessionUpdateRequest, SessionUser},
    services::users,
    session::SESSION_COOKIE,
};

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// login
///
/// [Public Route] Verifies credentials and issues a session token, returned in
/// the body and as an HttpOnly cookie. Unknown email and wrong password get the
/// same 401.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 400, description = "Email or password missing", body = ErrorBody),
        (status = 401, description = "Invalid email or password", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let user = credentials::verify(
        state.repo.as_ref(),
        &state.hasher,
        &payload.email,
        &payload.password,
    )
    .await
    .map_err(|e| {
        tracing::warn!(reason = %e, "Login rejected");
        AppError::from(e)
    })?;

    let (token, claims) = state.sessions.issue(&user)?;
    tracing::info!(user_id = %claims.sub, role = %claims.role, "Session issued");

    let jar = jar.add(session_cookie(token.clone(), state.config.secure_cookies));
    Ok((
        jar,
        Json(SessionResponse {
            token,
            user: claims.user(),
            expires_at: claims.exp,
        }),
    ))
}

/// logout
///
/// [Public Route] Clears the session cookie. The token itself is stateless and
/// stays valid until it expires.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Cookie cleared"))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}

/// get_session
///
/// [Authenticated Route] The identity claims carried by the caller's token.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Current session", body = SessionUser),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorBody)
    )
)]
pub async fn get_session(session: Session) -> Json<SessionUser> {
    Json(session.claims.user())
}

/// refresh_session
///
/// [Authenticated Route] Re-issues the token after a profile edit, with the
/// name, email and username now stored for the caller. Supplied values must
/// match that record. Id, role and expiry are unchanged.
#[utoipa::path(
    patch,
    path = "/api/auth/session",
    request_body = SessionUpdateRequest,
    responses(
        (status = 200, description = "Session refreshed", body = SessionResponse),
        (status = 400, description = "Invalid payload or values that differ from the stored profile", body = ErrorBody),
        (status = 401, description = "Missing, invalid or expired token, or account gone", body = ErrorBody)
    )
)]
pub async fn refresh_session(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    ValidJson(payload): ValidJson<SessionUpdateRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let snapshot = users::session_snapshot(state.repo.as_ref(), session.claims.sub, &payload).await?;
    let (token, claims) = state.sessions.refresh(&session.token, &snapshot)?;
    tracing::debug!(user_id = %claims.sub, "Session claims refreshed");

    let jar = jar.add(session_cookie(token.clone(), state.config.secure_cookies));
    Ok((
        jar,
        Json(SessionResponse {
            token,
            user: claims.user(),
            expires_at: claims.exp,
        }),
    ))
}
