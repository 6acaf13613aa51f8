use chrono::Utc;
use uuid::Uuid;

use super::{creation_scope, dedup, list_filter, resolve};
use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    models::{ListQuery, PatchWorkoutRequest, Workout, WorkoutRequest},
    policy::{Action, Resource, Scope, authorize, check_patch_fields, parse_refs},
    repository::Repository,
};

const RESOURCE: Resource = Resource::Workout;

/// References of a create/replace payload, all parsed or none.
struct Refs {
    students: Vec<Uuid>,
    exercises: Vec<Uuid>,
}

/// A plan nobody is assigned to is invisible to every student.
fn require_students(students: Vec<Uuid>) -> Result<Vec<Uuid>> {
    if students.is_empty() {
        return Err(AppError::Validation(
            "at least one student is required".to_string(),
        ));
    }
    Ok(students)
}

fn parse_payload_refs(req: &WorkoutRequest) -> Result<Refs> {
    let mut raw_students = req.students.clone();
    if let Some(user) = &req.user {
        raw_students.push(user.clone());
    }
    Ok(Refs {
        students: require_students(dedup(parse_refs(&raw_students)?))?,
        exercises: parse_refs(&req.exercises)?,
    })
}

pub async fn create(repo: &dyn Repository, actor: &AuthUser, req: WorkoutRequest) -> Result<Workout> {
    creation_scope(authorize(actor, RESOURCE, Action::Create))?;
    let refs = parse_payload_refs(&req)?;

    let now = Utc::now();
    let workout = Workout {
        id: Uuid::new_v4(),
        name_plan: req.name_plan,
        students: refs.students,
        exercises: refs.exercises,
        completed_exercises: Vec::new(),
        created_by: actor.id,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    let workout = repo.insert_workout(workout).await?;
    tracing::info!(
        workout_id = %workout.id,
        students = workout.students.len(),
        "Workout plan created"
    );
    Ok(workout)
}

/// list
///
/// Students see the plans they are assigned to. Trainers see their own plans,
/// optionally narrowed by `student` and `created_by`.
pub async fn list(repo: &dyn Repository, actor: &AuthUser, query: &ListQuery) -> Result<Vec<Workout>> {
    let scope = read_scope(actor)?;
    let filter = list_filter(actor, scope, query)?;
    Ok(repo.list_workouts(filter).await?)
}

fn read_scope(actor: &AuthUser) -> Result<Scope> {
    authorize(actor, RESOURCE, Action::Read).map_err(|_| AppError::Forbidden)
}

pub async fn get(repo: &dyn Repository, actor: &AuthUser, id: Uuid) -> Result<Workout> {
    let scope = read_scope(actor)?;
    repo.find_workout(id, scope)
        .await?
        .ok_or(AppError::NotFound(RESOURCE.label()))
}

async fn authorize_by_id(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: Uuid,
    action: Action,
) -> Result<Scope> {
    resolve(authorize(actor, RESOURCE, action), RESOURCE, |visible| {
        repo.find_workout(id, visible)
    })
    .await
}

async fn store(repo: &dyn Repository, workout: &Workout, scope: Scope) -> Result<Workout> {
    repo.update_workout(workout, scope)
        .await?
        .ok_or(AppError::NotFound(RESOURCE.label()))
}

/// replace
///
/// Full replacement by the owning trainer. Progress is cleared along with the
/// old exercise list.
pub async fn replace(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: Uuid,
    req: WorkoutRequest,
) -> Result<Workout> {
    let scope = authorize_by_id(repo, actor, id, Action::Replace).await?;
    let refs = parse_payload_refs(&req)?;

    let mut workout = repo
        .find_workout(id, scope)
        .await?
        .ok_or(AppError::NotFound(RESOURCE.label()))?;

    workout.name_plan = req.name_plan;
    workout.students = refs.students;
    workout.exercises = refs.exercises;
    workout.completed_exercises.clear();

    store(repo, &workout, scope).await
}

/// patch
///
/// Students may only send `completed_exercises`, and only for plans they are
/// assigned to. Every reference in the payload must parse before anything is
/// written. A progress-only update writes just that column, so it cannot undo
/// a concurrent edit of the plan itself.
pub async fn patch(
    repo: &dyn Repository,
    actor: &AuthUser,
    id: Uuid,
    req: PatchWorkoutRequest,
) -> Result<Workout> {
    let scope = authorize_by_id(repo, actor, id, Action::Patch).await?;
    check_patch_fields(RESOURCE, actor.role, &req.provided_fields())?;

    let students = req
        .students
        .as_deref()
        .map(parse_refs)
        .transpose()?
        .map(|ids| require_students(dedup(ids)))
        .transpose()?;
    let exercises = req.exercises.as_deref().map(parse_refs).transpose()?;
    let completed = req.completed_exercises.as_deref().map(parse_refs).transpose()?;

    if let (Some(completed), None, None, None) =
        (&completed, &req.name_plan, &students, &exercises)
    {
        let workout = repo
            .set_completed_exercises(id, &dedup(completed.clone()), scope)
            .await?
            .ok_or(AppError::NotFound(RESOURCE.label()))?;
        tracing::debug!(workout_id = %workout.id, actor_id = %actor.id, "Workout progress updated");
        return Ok(workout);
    }

    let mut workout = repo
        .find_workout(id, scope)
        .await?
        .ok_or(AppError::NotFound(RESOURCE.label()))?;

    if let Some(name_plan) = req.name_plan {
        workout.name_plan = name_plan;
    }
    if let Some(students) = students {
        workout.students = students;
    }
    if let Some(exercises) = exercises {
        workout.exercises = exercises;
    }
    if let Some(completed) = completed {
        workout.completed_exercises = dedup(completed);
    }

    let workout = store(repo, &workout, scope).await?;
    tracing::debug!(workout_id = %workout.id, actor_id = %actor.id, "Workout plan updated");
    Ok(workout)
}

pub async fn delete(repo: &dyn Repository, actor: &AuthUser, id: Uuid) -> Result<()> {
    let scope = authorize_by_id(repo, actor, id, Action::Delete).await?;
    if !repo.delete_workout(id, scope).await? {
        return Err(AppError::NotFound(RESOURCE.label()));
    }
    tracing::info!(workout_id = %id, "Workout plan deleted");
    Ok(())
}
