use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ErrorBody, Result},
    extract::{ResourceId, ValidJson},
    models::{ListQuery, PatchWorkoutRequest, Workout, WorkoutRequest, WorkoutView},
    services::{views, workouts},
};

/// create_workout
///
/// [Authenticated Route] Trainers only. `user` is shorthand for a one-student
/// plan and `workouts` is accepted in place of `exercises`.
#[utoipa::path(
    post,
    path = "/api/workouts",
    request_body = WorkoutRequest,
    responses(
        (status = 201, description = "Workout plan created", body = Workout),
        (status = 400, description = "Invalid payload or reference", body = ErrorBody),
        (status = 403, description = "Only trainers create workout plans", body = ErrorBody)
    )
)]
pub async fn create_workout(
    actor: AuthUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<WorkoutRequest>,
) -> Result<(StatusCode, Json<Workout>)> {
    let workout = workouts::create(state.repo.as_ref(), &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(workout)))
}

/// list_workouts
///
/// [Authenticated Route] Students get the plans they are assigned to; trainers
/// get their own, narrowed by the optional query parameters. Each plan embeds
/// summaries of its exercises, students and creator.
#[utoipa::path(
    get,
    path = "/api/workouts",
    params(ListQuery),
    responses(
        (status = 200, description = "Visible workout plans", body = [WorkoutView]),
        (status = 400, description = "Invalid filter reference", body = ErrorBody)
    )
)]
pub async fn list_workouts(
    actor: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<WorkoutView>>> {
    let repo = state.repo.as_ref();
    let plans = workouts::list(repo, &actor, &query).await?;
    Ok(Json(views::workouts(repo, plans).await?))
}

#[utoipa::path(
    get,
    path = "/api/workouts/{id}",
    params(("id" = String, Path, description = "Workout id (UUID)")),
    responses(
        (status = 200, description = "Workout plan", body = WorkoutView),
        (status = 404, description = "Not found or not visible", body = ErrorBody)
    )
)]
pub async fn get_workout(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<WorkoutView>> {
    let repo = state.repo.as_ref();
    let plan = workouts::get(repo, &actor, id).await?;
    Ok(Json(views::workout(repo, plan).await?))
}

#[utoipa::path(
    put,
    path = "/api/workouts/{id}",
    params(("id" = String, Path, description = "Workout id (UUID)")),
    request_body = WorkoutRequest,
    responses(
        (status = 200, description = "Replaced", body = Workout),
        (status = 400, description = "Invalid payload or reference", body = ErrorBody),
        (status = 403, description = "Visible but not yours to replace", body = ErrorBody),
        (status = 404, description = "Not found or not visible", body = ErrorBody)
    )
)]
pub async fn replace_workout(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    ValidJson(payload): ValidJson<WorkoutRequest>,
) -> Result<Json<Workout>> {
    Ok(Json(
        workouts::replace(state.repo.as_ref(), &actor, id, payload).await?,
    ))
}

/// patch_workout
///
/// [Authenticated Route] Students may only update `completed_exercises` on
/// plans assigned to them.
#[utoipa::path(
    patch,
    path = "/api/workouts/{id}",
    params(("id" = String, Path, description = "Workout id (UUID)")),
    request_body = PatchWorkoutRequest,
    responses(
        (status = 200, description = "Updated", body = Workout),
        (status = 400, description = "Invalid, empty or disallowed fields", body = ErrorBody),
        (status = 404, description = "Not found or not visible", body = ErrorBody)
    )
)]
pub async fn patch_workout(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    ValidJson(payload): ValidJson<PatchWorkoutRequest>,
) -> Result<Json<Workout>> {
    Ok(Json(
        workouts::patch(state.repo.as_ref(), &actor, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/workouts/{id}",
    params(("id" = String, Path, description = "Workout id (UUID)")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Visible but not yours to delete", body = ErrorBody),
        (status = 404, description = "Not found or not visible", body = ErrorBody)
    )
)]
pub async fn delete_workout(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<StatusCode> {
    workouts::delete(state.repo.as_ref(), &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
