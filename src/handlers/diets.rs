use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use super::today;
use crate::{
    AppState,
    auth::AuthUser,
    error::{ErrorBody, Result},
    extract::{ResourceId, ValidJson},
    models::{Diet, DietRequest, DietView, IntakeRequest, ListQuery, PatchDietRequest},
    services::{diets, views},
};

/// create_diet
///
/// [Authenticated Route] Nutritionists only. `water_meta` and `calories_meta`
/// are accepted as aliases for the targets.
#[utoipa::path(
    post,
    path = "/api/diets",
    request_body = DietRequest,
    responses(
        (status = 201, description = "Diet plan created", body = Diet),
        (status = 400, description = "Invalid payload or student reference", body = ErrorBody),
        (status = 403, description = "Only nutritionists create diet plans", body = ErrorBody)
    )
)]
pub async fn create_diet(
    actor: AuthUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<DietRequest>,
) -> Result<(StatusCode, Json<Diet>)> {
    let diet = diets::create(state.repo.as_ref(), &actor, payload, today()).await?;
    Ok((StatusCode::CREATED, Json(diet)))
}

/// list_diets
///
/// [Authenticated Route] Counters are reset first if a new day has started.
/// Each plan embeds summaries of its student and creator.
#[utoipa::path(
    get,
    path = "/api/diets",
    params(ListQuery),
    responses(
        (status = 200, description = "Visible diet plans", body = [DietView]),
        (status = 400, description = "Invalid filter reference", body = ErrorBody)
    )
)]
pub async fn list_diets(
    actor: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DietView>>> {
    let repo = state.repo.as_ref();
    let plans = diets::list(repo, &actor, &query, today()).await?;
    Ok(Json(views::diets(repo, plans).await?))
}

#[utoipa::path(
    get,
    path = "/api/diets/{id}",
    params(("id" = String, Path, description = "Diet id (UUID)")),
    responses(
        (status = 200, description = "Diet plan", body = DietView),
        (status = 404, description = "Not found or not visible", body = ErrorBody)
    )
)]
pub async fn get_diet(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<DietView>> {
    let repo = state.repo.as_ref();
    let plan = diets::get(repo, &actor, id, today()).await?;
    Ok(Json(views::diet(repo, plan).await?))
}

#[utoipa::path(
    put,
    path = "/api/diets/{id}",
    params(("id" = String, Path, description = "Diet id (UUID)")),
    request_body = DietRequest,
    responses(
        (status = 200, description = "Replaced", body = Diet),
        (status = 400, description = "Invalid payload or reference", body = ErrorBody),
        (status = 403, description = "Visible but not yours to replace", body = ErrorBody),
        (status = 404, description = "Not found or not visible", body = ErrorBody)
    )
)]
pub async fn replace_diet(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    ValidJson(payload): ValidJson<DietRequest>,
) -> Result<Json<Diet>> {
    Ok(Json(
        diets::replace(state.repo.as_ref(), &actor, id, payload, today()).await?,
    ))
}

/// patch_diet
///
/// [Authenticated Route] Students may only set `water_count` and
/// `calories_count` on their own plan.
#[utoipa::path(
    patch,
    path = "/api/diets/{id}",
    params(("id" = String, Path, description = "Diet id (UUID)")),
    request_body = PatchDietRequest,
    responses(
        (status = 200, description = "Updated", body = Diet),
        (status = 400, description = "Invalid, empty or disallowed fields", body = ErrorBody),
        (status = 404, description = "Not found or not visible", body = ErrorBody)
    )
)]
pub async fn patch_diet(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    ValidJson(payload): ValidJson<PatchDietRequest>,
) -> Result<Json<Diet>> {
    Ok(Json(
        diets::patch(state.repo.as_ref(), &actor, id, payload, today()).await?,
    ))
}

/// log_intake
///
/// [Authenticated Route] The assigned student adds water and/or calories to
/// today's counters.
#[utoipa::path(
    post,
    path = "/api/diets/{id}/intake",
    params(("id" = String, Path, description = "Diet id (UUID)")),
    request_body = IntakeRequest,
    responses(
        (status = 200, description = "Counters updated", body = Diet),
        (status = 400, description = "Invalid or empty payload", body = ErrorBody),
        (status = 403, description = "Only the assigned student logs intake", body = ErrorBody),
        (status = 404, description = "Not found or not visible", body = ErrorBody)
    )
)]
pub async fn log_intake(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    ValidJson(payload): ValidJson<IntakeRequest>,
) -> Result<Json<Diet>> {
    Ok(Json(
        diets::intake(state.repo.as_ref(), &actor, id, payload, today()).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/diets/{id}",
    params(("id" = String, Path, description = "Diet id (UUID)")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Visible but not yours to delete", body = ErrorBody),
        (status = 404, description = "Not found or not visible", body = ErrorBody)
    )
)]
pub async fn delete_diet(
    actor: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<StatusCode> {
    diets::delete(state.repo.as_ref(), &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
