use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{ListFilter, Repository, RepositoryError, UniqueField};
use crate::{
    models::{Diet, Exercise, UserRecord, Workout},
    policy::Scope,
};

const USER_COLUMNS: &str =
    "id, name, email, username, password_hash, role, created_at, updated_at, deleted_at";
const EXERCISE_COLUMNS: &str =
    "id, name, machine, reps, sets, timer, created_by, created_at, updated_at, deleted_at";
const WORKOUT_COLUMNS: &str = "id, name_plan, students, exercises, completed_exercises, \
     created_by, created_at, updated_at, deleted_at";
const DIET_COLUMNS: &str = "id, name_plan, student, water_target, calories_target, water_count, \
     calories_count, last_reset, created_by, created_at, updated_at, deleted_at";

/// The document tables, and how each one records its recipient students.
#[derive(Debug, Clone, Copy)]
enum Table {
    Exercises,
    Workouts,
    Diets,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Exercises => "exercises",
            Table::Workouts => "workouts",
            Table::Diets => "diets",
        }
    }

    fn columns(self) -> &'static str {
        match self {
            Table::Exercises => EXERCISE_COLUMNS,
            Table::Workouts => WORKOUT_COLUMNS,
            Table::Diets => DIET_COLUMNS,
        }
    }

    /// Appends a predicate matching documents assigned to `student`.
    fn push_recipient(self, builder: &mut QueryBuilder<'_, Postgres>, student: Uuid) {
        match self {
            Table::Exercises => {
                builder.push("FALSE");
            }
            Table::Workouts => {
                builder.push_bind(student).push(" = ANY(students)");
            }
            Table::Diets => {
                builder.push("student = ").push_bind(student);
            }
        }
    }

    /// Appends the policy scope as a predicate. Always preceded by `AND`.
    fn push_scope(self, builder: &mut QueryBuilder<'_, Postgres>, scope: Scope) {
        match scope {
            Scope::Owner(id) => {
                builder.push("created_by = ").push_bind(id);
            }
            Scope::Recipient(id) => self.push_recipient(builder, id),
            Scope::Nothing => {
                builder.push("FALSE");
            }
        }
    }

    fn select(self, filter: ListFilter) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM {} WHERE deleted_at IS NULL AND ",
            self.columns(),
            self.name()
        ));
        self.push_scope(&mut builder, filter.scope);

        if let Some(student) = filter.student {
            builder.push(" AND ");
            self.push_recipient(&mut builder, student);
        }
        if let Some(owner) = filter.created_by {
            builder.push(" AND created_by = ").push_bind(owner);
        }
        builder
    }

    fn select_one(self, id: Uuid, scope: Scope) -> QueryBuilder<'static, Postgres> {
        let mut builder = self.select(ListFilter::scoped(scope));
        builder.push(" AND id = ").push_bind(id);
        builder
    }

    /// `UPDATE <table> SET ` ready for the column assignments.
    fn update(self) -> QueryBuilder<'static, Postgres> {
        QueryBuilder::new(format!("UPDATE {} SET ", self.name()))
    }

    /// Closes an update started with `update()`: restricts it to the live,
    /// in-scope row and returns the new state.
    fn finish_update(self, builder: &mut QueryBuilder<'_, Postgres>, id: Uuid, scope: Scope) {
        builder
            .push(", updated_at = NOW() WHERE deleted_at IS NULL AND id = ")
            .push_bind(id)
            .push(" AND ");
        self.push_scope(builder, scope);
        builder.push(" RETURNING ").push(self.columns());
    }

    fn soft_delete(self, id: Uuid, scope: Scope) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(format!(
            "UPDATE {} SET deleted_at = NOW() WHERE deleted_at IS NULL AND id = ",
            self.name()
        ));
        builder.push_bind(id).push(" AND ");
        self.push_scope(&mut builder, scope);
        builder
    }
}

/// Maps a violation of the users' unique constraints to `Conflict`.
fn user_write_error(err: sqlx::Error) -> RepositoryError {
    let field = match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => match db.constraint() {
            Some("users_email_key") => Some(UniqueField::Email),
            Some("users_username_key") => Some(UniqueField::Username),
            _ => None,
        },
        _ => None,
    };
    match field {
        Some(field) => RepositoryError::Conflict(field),
        None => RepositoryError::Database(err),
    }
}

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are built at runtime with
/// `QueryBuilder` so the policy scope becomes part of the `WHERE` clause.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Users ---

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, UserRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let query =
            format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, UserRecord>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, RepositoryError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn username_taken(
        &self,
        username: &str,
        except: Option<Uuid>,
    ) -> Result<bool, RepositoryError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(except)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn insert_user(&self, user: UserRecord) -> Result<UserRecord, RepositoryError> {
        let query = format!(
            "INSERT INTO users (id, name, email, username, password_hash, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, UserRecord>(&query)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(user_write_error)?)
    }

    async fn update_user(&self, user: &UserRecord) -> Result<Option<UserRecord>, RepositoryError> {
        let query = format!(
            "UPDATE users SET name = $2, email = $3, username = $4, password_hash = $5, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, UserRecord>(&query)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(user_write_error)?)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY created_at ASC"
        );
        Ok(sqlx::query_as::<_, UserRecord>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn soft_delete_user(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, RepositoryError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) AND deleted_at IS NULL"
        );
        Ok(sqlx::query_as::<_, UserRecord>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    // --- Exercises ---

    async fn list_exercises(&self, filter: ListFilter) -> Result<Vec<Exercise>, RepositoryError> {
        let mut builder = Table::Exercises.select(filter);
        builder.push(" ORDER BY created_at ASC");
        Ok(builder
            .build_query_as::<Exercise>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_exercise(
        &self,
        id: Uuid,
        scope: Scope,
    ) -> Result<Option<Exercise>, RepositoryError> {
        let mut builder = Table::Exercises.select_one(id, scope);
        Ok(builder
            .build_query_as::<Exercise>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_exercise(&self, exercise: Exercise) -> Result<Exercise, RepositoryError> {
        let query = format!(
            "INSERT INTO exercises (id, name, machine, reps, sets, timer, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {EXERCISE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Exercise>(&query)
            .bind(exercise.id)
            .bind(&exercise.name)
            .bind(&exercise.machine)
            .bind(exercise.reps)
            .bind(exercise.sets)
            .bind(exercise.timer)
            .bind(exercise.created_by)
            .bind(exercise.created_at)
            .bind(exercise.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_exercise(
        &self,
        exercise: &Exercise,
        scope: Scope,
    ) -> Result<Option<Exercise>, RepositoryError> {
        let mut builder = Table::Exercises.update();
        builder
            .push("name = ")
            .push_bind(exercise.name.clone())
            .push(", machine = ")
            .push_bind(exercise.machine.clone())
            .push(", reps = ")
            .push_bind(exercise.reps)
            .push(", sets = ")
            .push_bind(exercise.sets)
            .push(", timer = ")
            .push_bind(exercise.timer);
        Table::Exercises.finish_update(&mut builder, exercise.id, scope);

        Ok(builder
            .build_query_as::<Exercise>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_exercise(&self, id: Uuid, scope: Scope) -> Result<bool, RepositoryError> {
        let mut builder = Table::Exercises.soft_delete(id, scope);
        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_exercises_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Exercise>, RepositoryError> {
        let query = format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = ANY($1) AND deleted_at IS NULL"
        );
        Ok(sqlx::query_as::<_, Exercise>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    // --- Workouts ---

    async fn list_workouts(&self, filter: ListFilter) -> Result<Vec<Workout>, RepositoryError> {
        let mut builder = Table::Workouts.select(filter);
        builder.push(" ORDER BY created_at ASC");
        Ok(builder
            .build_query_as::<Workout>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_workout(&self, id: Uuid, scope: Scope) -> Result<Option<Workout>, RepositoryError> {
        let mut builder = Table::Workouts.select_one(id, scope);
        Ok(builder
            .build_query_as::<Workout>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_workout(&self, workout: Workout) -> Result<Workout, RepositoryError> {
        let query = format!(
            "INSERT INTO workouts (id, name_plan, students, exercises, completed_exercises, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {WORKOUT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Workout>(&query)
            .bind(workout.id)
            .bind(&workout.name_plan)
            .bind(&workout.students)
            .bind(&workout.exercises)
            .bind(&workout.completed_exercises)
            .bind(workout.created_by)
            .bind(workout.created_at)
            .bind(workout.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_workout(
        &self,
        workout: &Workout,
        scope: Scope,
    ) -> Result<Option<Workout>, RepositoryError> {
        let mut builder = Table::Workouts.update();
        builder
            .push("name_plan = ")
            .push_bind(workout.name_plan.clone())
            .push(", students = ")
            .push_bind(workout.students.clone())
            .push(", exercises = ")
            .push_bind(workout.exercises.clone())
            .push(", completed_exercises = ")
            .push_bind(workout.completed_exercises.clone());
        Table::Workouts.finish_update(&mut builder, workout.id, scope);

        Ok(builder
            .build_query_as::<Workout>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_completed_exercises(
        &self,
        id: Uuid,
        completed: &[Uuid],
        scope: Scope,
    ) -> Result<Option<Workout>, RepositoryError> {
        let mut builder = Table::Workouts.update();
        builder
            .push("completed_exercises = ")
            .push_bind(completed.to_vec());
        Table::Workouts.finish_update(&mut builder, id, scope);

        Ok(builder
            .build_query_as::<Workout>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_workout(&self, id: Uuid, scope: Scope) -> Result<bool, RepositoryError> {
        let mut builder = Table::Workouts.soft_delete(id, scope);
        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Diets ---

    async fn list_diets(&self, filter: ListFilter) -> Result<Vec<Diet>, RepositoryError> {
        let mut builder = Table::Diets.select(filter);
        builder.push(" ORDER BY created_at ASC");
        Ok(builder
            .build_query_as::<Diet>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_diet(&self, id: Uuid, scope: Scope) -> Result<Option<Diet>, RepositoryError> {
        let mut builder = Table::Diets.select_one(id, scope);
        Ok(builder
            .build_query_as::<Diet>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_diet(&self, diet: Diet) -> Result<Diet, RepositoryError> {
        let query = format!(
            "INSERT INTO diets (id, name_plan, student, water_target, calories_target, water_count, \
             calories_count, last_reset, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {DIET_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Diet>(&query)
            .bind(diet.id)
            .bind(&diet.name_plan)
            .bind(diet.student)
            .bind(diet.water_target)
            .bind(diet.calories_target)
            .bind(diet.water_count)
            .bind(diet.calories_count)
            .bind(diet.last_reset)
            .bind(diet.created_by)
            .bind(diet.created_at)
            .bind(diet.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_diet(&self, diet: &Diet, scope: Scope) -> Result<Option<Diet>, RepositoryError> {
        let mut builder = Table::Diets.update();
        builder
            .push("name_plan = ")
            .push_bind(diet.name_plan.clone())
            .push(", student = ")
            .push_bind(diet.student)
            .push(", water_target = ")
            .push_bind(diet.water_target)
            .push(", calories_target = ")
            .push_bind(diet.calories_target)
            .push(", water_count = ")
            .push_bind(diet.water_count)
            .push(", calories_count = ")
            .push_bind(diet.calories_count)
            .push(", last_reset = ")
            .push_bind(diet.last_reset);
        Table::Diets.finish_update(&mut builder, diet.id, scope);

        Ok(builder
            .build_query_as::<Diet>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_diet(&self, id: Uuid, scope: Scope) -> Result<bool, RepositoryError> {
        let mut builder = Table::Diets.soft_delete(id, scope);
        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
