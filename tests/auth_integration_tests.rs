use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;
use uuid::Uuid;

use fitcoach::{
    AppConfig, AppError, AppState, AuthUser, MemoryRepository, PasswordHasher, SessionManager,
    auth::{Session, token_from_headers},
    credentials::{self, CredentialError},
    models::{Role, SessionUpdateRequest, UserRecord},
    repository::Repository,
    session::{Claims, SESSION_COOKIE, SessionError},
};

// --- Test Utilities ---

const SECRET: &str = "fitcoach-local-development-secret";

fn create_app_state() -> AppState {
    AppState::new(Arc::new(MemoryRepository::new()), AppConfig::default())
        .expect("default config builds a valid state")
}

fn user_record(role: Role) -> UserRecord {
    let now = Utc::now();
    UserRecord {
        id: Uuid::new_v4(),
        name: "Ana Souza".to_string(),
        email: "ana@example.com".to_string(),
        username: "ana".to_string(),
        password_hash: String::new(),
        role,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn unix_now() -> u64 {
    Utc::now().timestamp() as u64
}

/// Signs arbitrary claims, bypassing `SessionManager`, to forge expired or
/// foreign tokens.
fn sign(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn claims_for(user: &UserRecord, iat: u64, exp: u64) -> Claims {
    Claims {
        sub: user.id,
        role: user.role,
        name: user.name.clone(),
        email: user.email.clone(),
        username: user.username.clone(),
        iat,
        exp,
    }
}

fn get_request_parts(headers: &[(header::HeaderName, String)]) -> Parts {
    let mut builder = Request::builder().method(Method::GET).uri("/api/auth/session");
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    let (parts, _) = builder.body(()).unwrap().into_parts();
    parts
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

fn cookie(token: &str) -> (header::HeaderName, String) {
    (header::COOKIE, format!("{SESSION_COOKIE}={token}"))
}

// --- SessionManager ---

#[test]
fn test_issue_then_decode_returns_same_claims() {
    let manager = SessionManager::new(SECRET, 3600);
    let user = user_record(Role::Trainer);

    let (token, issued) = manager.issue(&user).unwrap();
    let decoded = manager.decode(&token).unwrap();

    assert_eq!(decoded, issued);
    assert_eq!(decoded.sub, user.id);
    assert_eq!(decoded.role, Role::Trainer);
    assert_eq!(decoded.exp - decoded.iat, 3600);
}

#[test]
fn test_decode_rejects_expired_token() {
    let manager = SessionManager::new(SECRET, 3600);
    let user = user_record(Role::Student);
    let now = unix_now();
    let token = sign(&claims_for(&user, now - 7200, now - 3600), SECRET);

    assert!(matches!(manager.decode(&token), Err(SessionError::Expired)));
}

#[test]
fn test_decode_rejects_foreign_signature_and_garbage() {
    let manager = SessionManager::new(SECRET, 3600);
    let user = user_record(Role::Student);
    let now = unix_now();
    let foreign = sign(&claims_for(&user, now, now + 3600), "some-other-secret");

    assert!(matches!(manager.decode(&foreign), Err(SessionError::Invalid)));
    assert!(matches!(manager.decode("not.a.token"), Err(SessionError::Invalid)));
}

#[test]
fn test_refresh_updates_display_claims_only() {
    let manager = SessionManager::new(SECRET, 3600);
    let user = user_record(Role::Nutritionist);
    let now = unix_now();
    // Issued a while ago so a refresh that re-stamped iat/exp would show.
    let original = claims_for(&user, now - 600, now + 3000);
    let token = sign(&original, SECRET);

    let update = SessionUpdateRequest {
        name: Some("Ana Lima".to_string()),
        email: None,
        username: Some("analima".to_string()),
    };
    let (new_token, refreshed) = manager.refresh(&token, &update).unwrap();

    assert_eq!(refreshed.name, "Ana Lima");
    assert_eq!(refreshed.username, "analima");
    assert_eq!(refreshed.email, original.email);
    assert_eq!(refreshed.sub, original.sub);
    assert_eq!(refreshed.role, original.role);
    assert_eq!(refreshed.iat, original.iat);
    assert_eq!(refreshed.exp, original.exp);
    assert_eq!(manager.decode(&new_token).unwrap(), refreshed);
}

#[test]
fn test_refresh_of_expired_token_fails() {
    let manager = SessionManager::new(SECRET, 3600);
    let user = user_record(Role::Student);
    let now = unix_now();
    let token = sign(&claims_for(&user, now - 7200, now - 3600), SECRET);

    let result = manager.refresh(&token, &SessionUpdateRequest::default());
    assert!(matches!(result, Err(SessionError::Expired)));
}

// --- Token Location ---

#[test]
fn test_bearer_header_wins_over_cookie() {
    let parts = get_request_parts(&[bearer("from-header"), cookie("from-cookie")]);
    assert_eq!(
        token_from_headers(&parts.headers).as_deref(),
        Some("from-header")
    );
}

#[test]
fn test_cookie_is_used_without_bearer() {
    let parts = get_request_parts(&[cookie("from-cookie")]);
    assert_eq!(
        token_from_headers(&parts.headers).as_deref(),
        Some("from-cookie")
    );
}

#[test]
fn test_non_bearer_authorization_is_ignored() {
    let parts = get_request_parts(&[(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".to_string())]);
    assert_eq!(token_from_headers(&parts.headers), None);
}

// --- AuthUser / Session Extractors ---

#[tokio::test]
async fn test_auth_user_from_bearer_token() {
    let state = create_app_state();
    let user = user_record(Role::Trainer);
    let (token, _) = state.sessions.issue(&user).unwrap();

    let mut parts = get_request_parts(&[bearer(&token)]);
    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(auth_user, AuthUser::new(user.id, Role::Trainer));
}

#[tokio::test]
async fn test_session_from_cookie_keeps_raw_token() {
    let state = create_app_state();
    let user = user_record(Role::Student);
    let (token, claims) = state.sessions.issue(&user).unwrap();

    let mut parts = get_request_parts(&[cookie(&token)]);
    let session = Session::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(session.token, token);
    assert_eq!(session.claims, claims);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let state = create_app_state();
    let mut parts = get_request_parts(&[]);

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    let err = result.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_and_forged_tokens_are_unauthorized() {
    let state = create_app_state();
    let user = user_record(Role::Student);
    let now = unix_now();

    let expired = sign(&claims_for(&user, now - 7200, now - 3600), SECRET);
    let forged = sign(&claims_for(&user, now, now + 3600), "attacker-secret");

    for token in [expired, forged, "garbage".to_string()] {
        let mut parts = get_request_parts(&[bearer(&token)]);
        let result = AuthUser::from_request_parts(&mut parts, &state).await;
        assert!(
            matches!(result, Err(AppError::Unauthorized)),
            "token {token:?} must be rejected"
        );
    }
}

// --- Credential Verifier ---

async fn seeded_repo(hasher: &PasswordHasher) -> (MemoryRepository, UserRecord) {
    let repo = MemoryRepository::new();
    let mut user = user_record(Role::Student);
    user.password_hash = hasher.hash("correct horse").unwrap();
    let user = repo.insert_user(user).await.unwrap();
    (repo, user)
}

#[test]
fn test_hash_is_salted_and_verifiable() {
    let hasher = PasswordHasher::new(1024, 1).unwrap();
    let first = hasher.hash("s3cret").unwrap();
    let second = hasher.hash("s3cret").unwrap();

    assert_ne!(first, second, "each hash carries its own salt");
    assert!(first.starts_with("$argon2id$"));
    assert!(hasher.verify("s3cret", &first).unwrap());
    assert!(!hasher.verify("wrong", &first).unwrap());
}

#[test]
fn test_malformed_stored_hash_is_an_error() {
    let hasher = PasswordHasher::new(1024, 1).unwrap();
    assert!(matches!(
        hasher.verify("anything", "plaintext-password"),
        Err(CredentialError::Hashing(_))
    ));
}

#[tokio::test]
async fn test_verify_accepts_correct_password() {
    let hasher = PasswordHasher::new(1024, 1).unwrap();
    let (repo, user) = seeded_repo(&hasher).await;

    let verified = credentials::verify(&repo, &hasher, "ana@example.com", "correct horse")
        .await
        .unwrap();
    assert_eq!(verified.id, user.id);
}

#[tokio::test]
async fn test_unknown_email_and_wrong_password_look_the_same() {
    let hasher = PasswordHasher::new(1024, 1).unwrap();
    let (repo, _) = seeded_repo(&hasher).await;

    let unknown = credentials::verify(&repo, &hasher, "nobody@example.com", "correct horse")
        .await
        .unwrap_err();
    let wrong = credentials::verify(&repo, &hasher, "ana@example.com", "incorrect")
        .await
        .unwrap_err();

    assert!(matches!(unknown, CredentialError::UnknownEmail));
    assert!(matches!(wrong, CredentialError::WrongPassword));

    let unknown = AppError::from(unknown);
    let wrong = AppError::from(wrong);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[tokio::test]
async fn test_missing_credentials_are_a_validation_error() {
    let hasher = PasswordHasher::new(1024, 1).unwrap();
    let (repo, _) = seeded_repo(&hasher).await;

    let err = credentials::verify(&repo, &hasher, "", "correct horse")
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::Missing));
    assert_eq!(AppError::from(err).status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleted_account_cannot_log_in() {
    let hasher = PasswordHasher::new(1024, 1).unwrap();
    let (repo, user) = seeded_repo(&hasher).await;
    assert!(repo.soft_delete_user(user.id).await.unwrap());

    let err = credentials::verify(&repo, &hasher, "ana@example.com", "correct horse")
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::UnknownEmail));
}
