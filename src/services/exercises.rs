use chrono::Utc;
use uuid::Uuid;

use super::{creation_scope, resolve};
use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    models::{Exercise, ExerciseRequest, PatchExerciseRequest},
    policy::{Action, Resource, Scope, authorize, check_patch_fields},
    repository::{ListFilter, Repository},
};

const RESOURCE: Resource = Resource::Exercise;

pub async fn create(
    repo: &dyn Repository,
    actor: &AuthUser,
    req: ExerciseRequest,
) -> Result<Exercise> {
    creation_scope(authorize(actor, RESOURCE, Action::Create))?;

    let now = Utc::now();
    let exercise = Exercise {
        id: Uuid::new_v4(),
        name: req.name,
        machine: req.machine,
        reps: req.reps,
        sets: req.sets,
        timer: req.timer,
        created_by: actor.id,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    let exercise = repo.insert_exercise(exercise).await?;
    tracing::info!(exercise_id = %exercise.id, trainer_id = %actor.id, "Exercise created");
    Ok(exercise)
}

/// Students always get an empty list; everyone else sees what they created.
pub async fn list(repo: &dyn Repository, actor: &AuthUser) -> Result<Vec<Exercise>> {
    let scope = resolve_read(actor)?;
    Ok(repo.list_exercises(ListFilter::scoped(scope)).await?)
}

fn resolve_read(actor: &AuthUser) -> Result<Scope> {
    authorize(actor, RESOURCE, Action::Read).map_err(|_| AppError::Forbidden)
}

pub async fn get(repo: &dyn Repository, actor: &AuthUser, id: Uuid) -> Result<Exercise> {
    let scope = resolve_read(actor)?;
    repo.find_exercise(id, scope)
        .await?
        .ok_or(AppError::NotFound(RESOURCE.label()))
}

/// Loads the document an update will apply to, after the policy check.
async fn load_for(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: Uuid,
    action: Action,
) -> Result<(Exercise, Scope)> {
    let scope = resolve(authorize(actor, RESOURCE, action), RESOURCE, |visible| {
        repo.find_exercise(id, visible)
    })
    .await?;
    let exercise = repo
        .find_exercise(id, scope)
        .await?
        .ok_or(AppError::NotFound(RESOURCE.label()))?;
    Ok((exercise, scope))
}

pub async fn replace(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: Uuid,
    req: ExerciseRequest,
) -> Result<Exercise> {
    let (mut exercise, scope) = load_for(repo, actor, id, Action::Replace).await?;

    exercise.name = req.name;
    exercise.machine = req.machine;
    exercise.reps = req.reps;
    exercise.sets = req.sets;
    exercise.timer = req.timer;

    repo.update_exercise(&exercise, scope)
        .await?
        .ok_or(AppError::NotFound(RESOURCE.label()))
}

pub async fn patch(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: Uuid,
    req: PatchExerciseRequest,
) -> Result<Exercise> {
    check_patch_fields(RESOURCE, actor.role, &req.provided_fields())?;
    let (mut exercise, scope) = load_for(repo, actor, id, Action::Patch).await?;

    if let Some(name) = req.name {
        exercise.name = name;
    }
    if let Some(machine) = req.machine {
        exercise.machine = Some(machine);
    }
    if let Some(reps) = req.reps {
        exercise.reps = reps;
    }
    if let Some(sets) = req.sets {
        exercise.sets = sets;
    }
    if let Some(timer) = req.timer {
        exercise.timer = Some(timer);
    }

    repo.update_exercise(&exercise, scope)
        .await?
        .ok_or(AppError::NotFound(RESOURCE.label()))
}

pub async fn delete(repo: &dyn Repository, actor: &AuthUser, id: Uuid) -> Result<()> {
    let scope = resolve(authorize(actor, RESOURCE, Action::Delete), RESOURCE, |visible| {
        repo.find_exercise(id, visible)
    })
    .await?;
    if !repo.delete_exercise(id, scope).await? {
        return Err(AppError::NotFound(RESOURCE.label()));
    }
    tracing::info!(exercise_id = %id, "Exercise deleted");
    Ok(())
}
