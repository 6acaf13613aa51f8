use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{Diet, Exercise, UserRecord, Workout},
    policy::Scope,
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Storage failures. `Conflict` carries the unique user field a write
/// collided with; everything else surfaces as 500 without details.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} is already taken")]
    Conflict(UniqueField),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// UniqueField
///
/// User columns that must be unique across every row, deleted or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
}

impl UniqueField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::Email => "email",
            UniqueField::Username => "username",
        }
    }
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ListFilter
///
/// A list query: the policy scope plus optional refinements from query
/// parameters. Refinements only ever narrow the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFilter {
    pub scope: Scope,
    /// Only documents assigned to this student.
    pub student: Option<Uuid>,
    /// Only documents created by this user.
    pub created_by: Option<Uuid>,
}

impl ListFilter {
    pub fn scoped(scope: Scope) -> Self {
        Self {
            scope,
            student: None,
            created_by: None,
        }
    }
}

/// Repository Trait
///
/// The persistence contract. Every document read and write takes the `Scope`
/// computed by the policy, and implementations apply it inside the query, so a
/// document outside it is indistinguishable from one that does not exist.
/// Soft-deleted rows are excluded everywhere except the uniqueness checks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;
    /// True if any row, deleted or not and other than `except`, holds this email.
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, RepositoryError>;
    /// True if any row, deleted or not and other than `except`, holds this username.
    async fn username_taken(
        &self,
        username: &str,
        except: Option<Uuid>,
    ) -> Result<bool, RepositoryError>;
    /// Fails with `Conflict` when the email or username is already held.
    async fn insert_user(&self, user: UserRecord) -> Result<UserRecord, RepositoryError>;
    /// Writes name, email, username and password hash. `None` when the user is
    /// gone, `Conflict` when another row holds the new email or username.
    async fn update_user(&self, user: &UserRecord) -> Result<Option<UserRecord>, RepositoryError>;
    async fn list_users(&self) -> Result<Vec<UserRecord>, RepositoryError>;
    async fn soft_delete_user(&self, id: Uuid) -> Result<bool, RepositoryError>;
    /// Live users among `ids`, in no particular order. Used to embed summaries.
    async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, RepositoryError>;

    // --- Exercises ---
    async fn list_exercises(&self, filter: ListFilter) -> Result<Vec<Exercise>, RepositoryError>;
    async fn find_exercise(&self, id: Uuid, scope: Scope)
    -> Result<Option<Exercise>, RepositoryError>;
    async fn insert_exercise(&self, exercise: Exercise) -> Result<Exercise, RepositoryError>;
    async fn update_exercise(
        &self,
        exercise: &Exercise,
        scope: Scope,
    ) -> Result<Option<Exercise>, RepositoryError>;
    async fn delete_exercise(&self, id: Uuid, scope: Scope) -> Result<bool, RepositoryError>;
    /// Live exercises among `ids`, unscoped. Only for embedding the exercises a
    /// visible plan references.
    async fn find_exercises_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Exercise>, RepositoryError>;

    // --- Workouts ---
    async fn list_workouts(&self, filter: ListFilter) -> Result<Vec<Workout>, RepositoryError>;
    async fn find_workout(&self, id: Uuid, scope: Scope) -> Result<Option<Workout>, RepositoryError>;
    async fn insert_workout(&self, workout: Workout) -> Result<Workout, RepositoryError>;
    async fn update_workout(
        &self,
        workout: &Workout,
        scope: Scope,
    ) -> Result<Option<Workout>, RepositoryError>;
    /// Writes only `completed_exercises`, leaving the rest of the row as stored.
    async fn set_completed_exercises(
        &self,
        id: Uuid,
        completed: &[Uuid],
        scope: Scope,
    ) -> Result<Option<Workout>, RepositoryError>;
    async fn delete_workout(&self, id: Uuid, scope: Scope) -> Result<bool, RepositoryError>;

    // --- Diets ---
    async fn list_diets(&self, filter: ListFilter) -> Result<Vec<Diet>, RepositoryError>;
    async fn find_diet(&self, id: Uuid, scope: Scope) -> Result<Option<Diet>, RepositoryError>;
    async fn insert_diet(&self, diet: Diet) -> Result<Diet, RepositoryError>;
    async fn update_diet(&self, diet: &Diet, scope: Scope) -> Result<Option<Diet>, RepositoryError>;
    async fn delete_diet(&self, id: Uuid, scope: Scope) -> Result<bool, RepositoryError>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
