use crate::{
    AppState,
    handlers::{self, session, users},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(handlers::health))
        // POST /api/users
        // Self-registration. GET on the same path is authenticated.
        .route("/api/users", post(users::signup))
        // POST /api/auth/login
        // Issues a token (body + HttpOnly cookie).
        .route("/api/auth/login", post(session::login))
        // POST /api/auth/logout
        // Clears the cookie only; tokens are stateless.
        .route("/api/auth/logout", post(session::logout))
}
