use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ErrorBody, Result},
    extract::{ResourceId, ValidJson},
    models::{Exercise, ExerciseRequest, PatchExerciseRequest},
    services::exercises,
};

/// create_exercise
///
/// [Authenticated Route] Trainers only.
#[utoipa::path(
    post,
    path = "/api/exercises",
    request_body = ExerciseRequest,
    responses(
        (status = 201, description = "Exercise created", body = Exercise),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 403, description = "Only trainers create exercises", body = ErrorBody)
    )
)]
pub async fn create_exercise(
    actor: AuthUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ExerciseRequest>,
) -> Result<(StatusCode, Json<Exercise>)> {
    let exercise = exercises::create(state.repo.as_ref(), &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(exercise)))
}

/// list_exercises
///
/// [Authenticated Route] The caller's own exercises. Always empty for students.
#[utoipa::path(
    get,
    path = "/api/exercises",
    responses((status = 200, description = "Visible exercises", body = [Exercise]))
)]
pub async fn list_exercises(
    actor: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Exercise>>> {
    Ok(Json(exercises::list(state.repo.as_ref(), &actor).await?))
}

#[utoipa::path(
    get,
    path = "/api/exercises/{id}",
    params(("id" = String, Path, description = "Exercise id (UUID)")),
    responses(
        (status = 200, description = "Exercise", body = Exercise),
        (status = 404, description = "Not found or not yours", body = ErrorBody)
    )
)]
pub async fn get_exercise(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<Exercise>> {
    Ok(Json(exercises::get(state.repo.as_ref(), &actor, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/exercises/{id}",
    params(("id" = String, Path, description = "Exercise id (UUID)")),
    request_body = ExerciseRequest,
    responses(
        (status = 200, description = "Replaced", body = Exercise),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 404, description = "Not found or not yours", body = ErrorBody)
    )
)]
pub async fn replace_exercise(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    ValidJson(payload): ValidJson<ExerciseRequest>,
) -> Result<Json<Exercise>> {
    Ok(Json(
        exercises::replace(state.repo.as_ref(), &actor, id, payload).await?,
    ))
}

#[utoipa::path(
    patch,
    path = "/api/exercises/{id}",
    params(("id" = String, Path, description = "Exercise id (UUID)")),
    request_body = PatchExerciseRequest,
    responses(
        (status = 200, description = "Updated", body = Exercise),
        (status = 400, description = "Invalid or empty payload", body = ErrorBody),
        (status = 404, description = "Not found or not yours", body = ErrorBody)
    )
)]
pub async fn patch_exercise(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    ValidJson(payload): ValidJson<PatchExerciseRequest>,
) -> Result<Json<Exercise>> {
    Ok(Json(
        exercises::patch(state.repo.as_ref(), &actor, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/exercises/{id}",
    params(("id" = String, Path, description = "Exercise id (UUID)")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not yours", body = ErrorBody)
    )
)]
pub async fn delete_exercise(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<StatusCode> {
    exercises::delete(state.repo.as_ref(), &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
