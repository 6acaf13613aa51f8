use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ErrorBody, Result},
    extract::{ResourceId, ValidJson},
    models::{PatchUserRequest, ReplaceUserRequest, SignupRequest, UserProfile},
    services::users,
};

/// signup
///
/// [Public Route] Registers a new account. Returns the public profile; the
/// password hash never leaves the server.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Invalid payload or email/username already in use", body = ErrorBody)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<SignupRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    let profile = users::signup(state.repo.as_ref(), &state.hasher, payload).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// list_users
///
/// [Authenticated Route] Directory of active users. Closed to students.
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All active users", body = [UserProfile]),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Students cannot list users", body = ErrorBody)
    )
)]
pub async fn list_users(
    actor: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>> {
    Ok(Json(users::list(state.repo.as_ref(), &actor).await?))
}

/// get_user
///
/// [Authenticated Route] Own profile only.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 403, description = "Not your account", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn get_user(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<UserProfile>> {
    Ok(Json(users::get(state.repo.as_ref(), &actor, id).await?))
}

/// replace_user
///
/// [Authenticated Route] Full profile replacement. Clients holding a session
/// should follow up with `PATCH /api/auth/session` so the token reflects the
/// new name, email or username.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    request_body = ReplaceUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Invalid payload or conflict", body = ErrorBody),
        (status = 403, description = "Not your account", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn replace_user(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    ValidJson(payload): ValidJson<ReplaceUserRequest>,
) -> Result<Json<UserProfile>> {
    let profile = users::replace(state.repo.as_ref(), &state.hasher, &actor, id, payload).await?;
    Ok(Json(profile))
}

/// patch_user
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    request_body = PatchUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Invalid payload, empty patch or conflict", body = ErrorBody),
        (status = 403, description = "Not your account", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn patch_user(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    ValidJson(payload): ValidJson<PatchUserRequest>,
) -> Result<Json<UserProfile>> {
    let profile = users::patch(state.repo.as_ref(), &state.hasher, &actor, id, payload).await?;
    Ok(Json(profile))
}

/// delete_user
///
/// [Authenticated Route] Soft-deletes the caller's own account.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not your account", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn delete_user(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<StatusCode> {
    users::delete(state.repo.as_ref(), &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
