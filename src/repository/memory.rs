use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ListFilter, Repository, RepositoryError, UniqueField};
use crate::{
    models::{Diet, Exercise, Scoped, UserRecord, Workout},
    policy::Scope,
};

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    exercises: Vec<Exercise>,
    workouts: Vec<Workout>,
    diets: Vec<Diet>,
}

/// MemoryRepository
///
/// In-process `Repository` with the same scoping and soft-delete semantics as
/// the Postgres one. Used by the router tests and for running the API without a
/// database.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches<T: Scoped>(doc: &T, filter: &ListFilter) -> bool {
    filter.scope.admits(doc)
        && filter.student.is_none_or(|s| doc.has_recipient(s))
        && filter.created_by.is_none_or(|c| doc.owner() == c)
}

fn list<T: Scoped + Clone>(docs: &[T], filter: &ListFilter) -> Vec<T> {
    docs.iter().filter(|d| matches(*d, filter)).cloned().collect()
}

fn find<T: Scoped + Clone>(docs: &[T], id: Uuid, scope: Scope, id_of: fn(&T) -> Uuid) -> Option<T> {
    docs.iter()
        .find(|d| id_of(d) == id && scope.admits(*d))
        .cloned()
}

/// Replaces the live, in-scope document with `id`. Returns what was stored.
fn replace<T: Scoped + Clone>(
    docs: &mut [T],
    id: Uuid,
    scope: Scope,
    id_of: fn(&T) -> Uuid,
    new: T,
) -> Option<T> {
    let idx = docs.iter().position(|d| id_of(d) == id && scope.admits(d))?;
    docs[idx] = new;
    Some(docs[idx].clone())
}

/// Marks the live, in-scope document as deleted via `mark`.
fn soft_delete<T: Scoped>(
    docs: &mut [T],
    id: Uuid,
    scope: Scope,
    id_of: fn(&T) -> Uuid,
    mark: fn(&mut T),
) -> bool {
    match docs.iter().position(|d| id_of(d) == id && scope.admits(d)) {
        Some(idx) => {
            mark(&mut docs[idx]);
            true
        }
        None => false,
    }
}

/// The unique field `user` would collide on with any other row, deleted or not.
fn collision(users: &[UserRecord], user: &UserRecord) -> Option<UniqueField> {
    let others = || users.iter().filter(|u| u.id != user.id);
    if others().any(|u| u.email == user.email) {
        return Some(UniqueField::Email);
    }
    if others().any(|u| u.username == user.username) {
        return Some(UniqueField::Username);
    }
    None
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- Users ---

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .cloned())
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .any(|u| u.email == email && Some(u.id) != except))
    }

    async fn username_taken(
        &self,
        username: &str,
        except: Option<Uuid>,
    ) -> Result<bool, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .any(|u| u.username == username && Some(u.id) != except))
    }

    async fn insert_user(&self, user: UserRecord) -> Result<UserRecord, RepositoryError> {
        let mut tables = self.tables.write().await;
        if let Some(field) = collision(&tables.users, &user) {
            return Err(RepositoryError::Conflict(field));
        }
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &UserRecord) -> Result<Option<UserRecord>, RepositoryError> {
        let mut tables = self.tables.write().await;
        if let Some(field) = collision(&tables.users, user) {
            return Err(RepositoryError::Conflict(field));
        }
        let Some(stored) = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id && u.deleted_at.is_none())
        else {
            return Ok(None);
        };
        stored.name = user.name.clone();
        stored.email = user.email.clone();
        stored.username = user.username.clone();
        stored.password_hash = user.password_hash.clone();
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn soft_delete_user(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        match tables
            .users
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
        {
            Some(user) => {
                user.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id) && u.deleted_at.is_none())
            .cloned()
            .collect())
    }

    // --- Exercises ---

    async fn list_exercises(&self, filter: ListFilter) -> Result<Vec<Exercise>, RepositoryError> {
        Ok(list(&self.tables.read().await.exercises, &filter))
    }

    async fn find_exercise(
        &self,
        id: Uuid,
        scope: Scope,
    ) -> Result<Option<Exercise>, RepositoryError> {
        Ok(find(&self.tables.read().await.exercises, id, scope, |e| e.id))
    }

    async fn insert_exercise(&self, exercise: Exercise) -> Result<Exercise, RepositoryError> {
        self.tables.write().await.exercises.push(exercise.clone());
        Ok(exercise)
    }

    async fn update_exercise(
        &self,
        exercise: &Exercise,
        scope: Scope,
    ) -> Result<Option<Exercise>, RepositoryError> {
        let mut new = exercise.clone();
        new.updated_at = Utc::now();
        let mut tables = self.tables.write().await;
        Ok(replace(&mut tables.exercises, exercise.id, scope, |e| e.id, new))
    }

    async fn delete_exercise(&self, id: Uuid, scope: Scope) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(soft_delete(&mut tables.exercises, id, scope, |e| e.id, |e| {
            e.deleted_at = Some(Utc::now())
        }))
    }

    async fn find_exercises_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Exercise>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .exercises
            .iter()
            .filter(|e| ids.contains(&e.id) && !e.is_deleted())
            .cloned()
            .collect())
    }

    // --- Workouts ---

    async fn list_workouts(&self, filter: ListFilter) -> Result<Vec<Workout>, RepositoryError> {
        Ok(list(&self.tables.read().await.workouts, &filter))
    }

    async fn find_workout(&self, id: Uuid, scope: Scope) -> Result<Option<Workout>, RepositoryError> {
        Ok(find(&self.tables.read().await.workouts, id, scope, |w| w.id))
    }

    async fn insert_workout(&self, workout: Workout) -> Result<Workout, RepositoryError> {
        self.tables.write().await.workouts.push(workout.clone());
        Ok(workout)
    }

    async fn update_workout(
        &self,
        workout: &Workout,
        scope: Scope,
    ) -> Result<Option<Workout>, RepositoryError> {
        let mut new = workout.clone();
        new.updated_at = Utc::now();
        let mut tables = self.tables.write().await;
        Ok(replace(&mut tables.workouts, workout.id, scope, |w| w.id, new))
    }

    async fn set_completed_exercises(
        &self,
        id: Uuid,
        completed: &[Uuid],
        scope: Scope,
    ) -> Result<Option<Workout>, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables
            .workouts
            .iter_mut()
            .find(|w| w.id == id && scope.admits(&**w))
        else {
            return Ok(None);
        };
        stored.completed_exercises = completed.to_vec();
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn delete_workout(&self, id: Uuid, scope: Scope) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(soft_delete(&mut tables.workouts, id, scope, |w| w.id, |w| {
            w.deleted_at = Some(Utc::now())
        }))
    }

    // --- Diets ---

    async fn list_diets(&self, filter: ListFilter) -> Result<Vec<Diet>, RepositoryError> {
        Ok(list(&self.tables.read().await.diets, &filter))
    }

    async fn find_diet(&self, id: Uuid, scope: Scope) -> Result<Option<Diet>, RepositoryError> {
        Ok(find(&self.tables.read().await.diets, id, scope, |d| d.id))
    }

    async fn insert_diet(&self, diet: Diet) -> Result<Diet, RepositoryError> {
        self.tables.write().await.diets.push(diet.clone());
        Ok(diet)
    }

    async fn update_diet(&self, diet: &Diet, scope: Scope) -> Result<Option<Diet>, RepositoryError> {
        let mut new = diet.clone();
        new.updated_at = Utc::now();
        let mut tables = self.tables.write().await;
        Ok(replace(&mut tables.diets, diet.id, scope, |d| d.id, new))
    }

    async fn delete_diet(&self, id: Uuid, scope: Scope) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(soft_delete(&mut tables.diets, id, scope, |d| d.id, |d| {
            d.deleted_at = Some(Utc::now())
        }))
    }
}
