//! Route guard.
//!
//! Runs once per request, before routing, and decides whether the path needs a
//! session at all. Page routes without a usable token are redirected to the
//! login page; the JSON API answers 401 on its own.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{auth::token_from_headers, session::SessionManager};

/// Where unauthenticated page requests are sent.
pub const LOGIN_PATH: &str = "/login";

/// Exact paths reachable without a session.
const PUBLIC_PATHS: &[&str] = &["/", "/login", "/signup", "/cadastro", "/favicon.ico", "/health"];

/// Path prefixes reachable without a session.
const PUBLIC_PREFIXES: &[&str] = &["/static/", "/assets/", "/api/", "/swagger-ui", "/api-docs"];

/// GuardDecision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Send the caller to `login`, remembering where they were going.
    Redirect { login: &'static str, callback_url: String },
}

impl GuardDecision {
    /// Full redirect target, with the callback URL percent-encoded.
    pub fn location(&self) -> Option<String> {
        match self {
            GuardDecision::Allow => None,
            GuardDecision::Redirect {
                login,
                callback_url,
            } => Some(format!(
                "{login}?callbackUrl={}",
                urlencoding::encode(callback_url)
            )),
        }
    }
}

pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// decide
///
/// `authenticated` is whether the request carries a present and decodable token.
pub fn decide(path: &str, authenticated: bool) -> GuardDecision {
    if authenticated || is_public(path) {
        GuardDecision::Allow
    } else {
        GuardDecision::Redirect {
            login: LOGIN_PATH,
            callback_url: path.to_string(),
        }
    }
}

/// route_guard
///
/// Middleware form of `decide`, applied outermost in `create_router`.
pub async fn route_guard(
    State(sessions): State<SessionManager>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    // Public paths never pay for a token decode.
    let authenticated = !is_public(&path)
        && token_from_headers(request.headers())
            .map(|token| sessions.decode(&token).is_ok())
            .unwrap_or(false);

    match decide(&path, authenticated).location() {
        None => next.run(request).await,
        Some(location) => {
            tracing::debug!(path = %path, "Unauthenticated page request, redirecting to login");
            Redirect::to(&location).into_response()
        }
    }
}
