//! Reference resolution for plan reads.
//!
//! Workouts and diets store bare ids. Reads embed summaries of the exercises
//! and accounts behind them, fetched in one batch per kind. A plan the caller
//! can see makes its referenced exercises readable through it, even where the
//! caller's own exercise scope is empty.

use std::collections::HashMap;

use uuid::Uuid;

use super::dedup;
use crate::{
    error::Result,
    models::{Diet, DietView, ExerciseSummary, UserSummary, Workout, WorkoutView},
    repository::Repository,
};

async fn user_summaries(repo: &dyn Repository, ids: Vec<Uuid>) -> Result<HashMap<Uuid, UserSummary>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = repo.find_users_by_ids(&dedup(ids)).await?;
    Ok(users.into_iter().map(|u| (u.id, UserSummary::from(u))).collect())
}

pub async fn workouts(repo: &dyn Repository, workouts: Vec<Workout>) -> Result<Vec<WorkoutView>> {
    let mut exercise_ids = Vec::new();
    let mut user_ids = Vec::new();
    for workout in &workouts {
        exercise_ids.extend_from_slice(&workout.exercises);
        user_ids.extend_from_slice(&workout.students);
        user_ids.push(workout.created_by);
    }

    let exercises: HashMap<Uuid, ExerciseSummary> = if exercise_ids.is_empty() {
        HashMap::new()
    } else {
        repo.find_exercises_by_ids(&dedup(exercise_ids))
            .await?
            .into_iter()
            .map(|e| (e.id, ExerciseSummary::from(e)))
            .collect()
    };
    let users = user_summaries(repo, user_ids).await?;

    Ok(workouts
        .into_iter()
        .map(|workout| WorkoutView {
            exercise_details: workout
                .exercises
                .iter()
                .filter_map(|id| exercises.get(id).cloned())
                .collect(),
            student_details: workout
                .students
                .iter()
                .filter_map(|id| users.get(id).cloned())
                .collect(),
            creator: users.get(&workout.created_by).cloned(),
            workout,
        })
        .collect())
}

pub async fn workout(repo: &dyn Repository, workout: Workout) -> Result<WorkoutView> {
    let mut views = workouts(repo, vec![workout]).await?;
    // One plan in, one view out.
    Ok(views.remove(0))
}

pub async fn diets(repo: &dyn Repository, diets: Vec<Diet>) -> Result<Vec<DietView>> {
    let user_ids = diets
        .iter()
        .flat_map(|d| [d.student, d.created_by])
        .collect();
    let users = user_summaries(repo, user_ids).await?;

    Ok(diets
        .into_iter()
        .map(|diet| DietView {
            student_details: users.get(&diet.student).cloned(),
            creator: users.get(&diet.created_by).cloned(),
            diet,
        })
        .collect())
}

pub async fn diet(repo: &dyn Repository, diet: Diet) -> Result<DietView> {
    let mut views = diets(repo, vec![diet]).await?;
    Ok(views.remove(0))
}
