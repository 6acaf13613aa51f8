use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::{creation_scope, list_filter, resolve};
use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    models::{Diet, DietRequest, IntakeRequest, ListQuery, PatchDietRequest},
    policy::{Action, Resource, Scope, authorize, check_patch_fields, parse_ref},
    repository::Repository,
};

const RESOURCE: Resource = Resource::Diet;

/// Applies the daily rollover and persists it when it changed anything.
async fn roll_over(repo: &dyn Repository, mut diet: Diet, scope: Scope, today: NaiveDate) -> Result<Diet> {
    if !diet.roll_over(today) {
        return Ok(diet);
    }
    tracing::debug!(diet_id = %diet.id, %today, "Resetting daily diet counters");
    diet = repo
        .update_diet(&diet, scope)
        .await?
        .ok_or(AppError::NotFound(RESOURCE.label()))?;
    Ok(diet)
}

pub async fn create(
    repo: &dyn Repository,
    actor: &AuthUser,
    req: DietRequest,
    today: NaiveDate,
) -> Result<Diet> {
    creation_scope(authorize(actor, RESOURCE, Action::Create))?;
    let student = parse_ref(&req.student)?;

    let now = Utc::now();
    let diet = Diet {
        id: Uuid::new_v4(),
        name_plan: req.name_plan,
        student,
        water_target: req.water_target,
        calories_target: req.calories_target,
        water_count: req.water_count.unwrap_or(0.0),
        calories_count: req.calories_count.unwrap_or(0.0),
        last_reset: today,
        created_by: actor.id,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    let diet = repo.insert_diet(diet).await?;
    tracing::info!(diet_id = %diet.id, student_id = %diet.student, "Diet plan created");
    Ok(diet)
}

fn read_scope(actor: &AuthUser) -> Result<Scope> {
    authorize(actor, RESOURCE, Action::Read).map_err(|_| AppError::Forbidden)
}

/// list
///
/// Students see the plan(s) assigned to them; nutritionists see their own,
/// optionally narrowed by `student` and `created_by`. Every returned plan has
/// had its daily rollover applied.
pub async fn list(
    repo: &dyn Repository,
    actor: &AuthUser,
    query: &ListQuery,
    today: NaiveDate,
) -> Result<Vec<Diet>> {
    let scope = read_scope(actor)?;
    let filter = list_filter(actor, scope, query)?;

    let mut diets = Vec::new();
    for diet in repo.list_diets(filter).await? {
        diets.push(roll_over(repo, diet, scope, today).await?);
    }
    Ok(diets)
}

pub async fn get(repo: &dyn Repository, actor: &AuthUser, id: Uuid, today: NaiveDate) -> Result<Diet> {
    let scope = read_scope(actor)?;
    let diet = repo
        .find_diet(id, scope)
        .await?
        .ok_or(AppError::NotFound(RESOURCE.label()))?;
    roll_over(repo, diet, scope, today).await
}

/// Policy check for a by-id operation, then the rolled-over document.
async fn load_for(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: Uuid,
    action: Action,
    today: NaiveDate,
) -> Result<(Diet, Scope)> {
    let scope = resolve(authorize(actor, RESOURCE, action), RESOURCE, |visible| {
        repo.find_diet(id, visible)
    })
    .await?;
    let mut diet = repo
        .find_diet(id, scope)
        .await?
        .ok_or(AppError::NotFound(RESOURCE.label()))?;
    // The caller persists this together with its own changes.
    diet.roll_over(today);
    Ok((diet, scope))
}

async fn store(repo: &dyn Repository, diet: &Diet, scope: Scope) -> Result<Diet> {
    repo.update_diet(diet, scope)
        .await?
        .ok_or(AppError::NotFound(RESOURCE.label()))
}

/// replace
///
/// Full replacement by the owning nutritionist. Counters not supplied start
/// again from zero.
pub async fn replace(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: Uuid,
    req: DietRequest,
    today: NaiveDate,
) -> Result<Diet> {
    let student = parse_ref(&req.student)?;
    let (mut diet, scope) = load_for(repo, actor, id, Action::Replace, today).await?;

    diet.student = student;
    diet.name_plan = req.name_plan;
    diet.water_target = req.water_target;
    diet.calories_target = req.calories_target;
    diet.water_count = req.water_count.unwrap_or(0.0);
    diet.calories_count = req.calories_count.unwrap_or(0.0);

    store(repo, &diet, scope).await
}

/// patch
///
/// Students may only set their two consumption counters.
pub async fn patch(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: Uuid,
    req: PatchDietRequest,
    today: NaiveDate,
) -> Result<Diet> {
    check_patch_fields(RESOURCE, actor.role, &req.provided_fields())?;
    let student = req.student.as_deref().map(parse_ref).transpose()?;
    let (mut diet, scope) = load_for(repo, actor, id, Action::Patch, today).await?;

    if let Some(student) = student {
        diet.student = student;
    }
    if let Some(name_plan) = req.name_plan {
        diet.name_plan = name_plan;
    }
    if let Some(water_target) = req.water_target {
        diet.water_target = water_target;
    }
    if let Some(calories_target) = req.calories_target {
        diet.calories_target = calories_target;
    }
    if let Some(water_count) = req.water_count {
        diet.water_count = water_count;
    }
    if let Some(calories_count) = req.calories_count {
        diet.calories_count = calories_count;
    }

    store(repo, &diet, scope).await
}

/// intake
///
/// Adds to today's counters. Only the assigned student may log intake.
pub async fn intake(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: Uuid,
    req: IntakeRequest,
    today: NaiveDate,
) -> Result<Diet> {
    if req.water.is_none() && req.calories.is_none() {
        return Err(AppError::Validation("no fields to update".to_string()));
    }
    let (mut diet, scope) = load_for(repo, actor, id, Action::LogIntake, today).await?;

    diet.water_count += req.water.unwrap_or(0.0);
    diet.calories_count += req.calories.unwrap_or(0.0);

    let diet = store(repo, &diet, scope).await?;
    tracing::debug!(
        diet_id = %diet.id,
        water = diet.water_count,
        calories = diet.calories_count,
        "Intake logged"
    );
    Ok(diet)
}

pub async fn delete(repo: &dyn Repository, actor: &AuthUser, id: Uuid) -> Result<()> {
    let scope = resolve(authorize(actor, RESOURCE, Action::Delete), RESOURCE, |visible| {
        repo.find_diet(id, visible)
    })
    .await?;
    if !repo.delete_diet(id, scope).await? {
        return Err(AppError::NotFound(RESOURCE.label()));
    }
    tracing::info!(diet_id = %id, "Diet plan deleted");
    Ok(())
}
