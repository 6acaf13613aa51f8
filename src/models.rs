use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// --- Roles ---

/// Role
///
/// The three account kinds. Wire form is the lowercase name; the single-letter
/// codes used by older clients ("A", "N", "P") are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[serde(alias = "A")]
    Student,
    #[serde(alias = "N")]
    Nutritionist,
    #[serde(alias = "P")]
    Trainer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Nutritionist => "nutritionist",
            Role::Trainer => "trainer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" | "A" => Ok(Role::Student),
            "nutritionist" | "N" => Ok(Role::Nutritionist),
            "trainer" | "P" => Ok(Role::Trainer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// --- Core Records (Mapped to Database) ---

/// UserRecord
///
/// The stored identity, including the password hash. Never serialized to clients;
/// see `UserProfile` for the public view.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// UserProfile
///
/// Public projection of a user: everything except the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub username: String,
    #[serde(rename = "type")]
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for UserProfile {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Exercise
///
/// A single movement prescription, owned by the trainer who created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub machine: Option<String>,
    pub reps: i32,
    pub sets: i32,
    /// Rest or hold timer, in seconds.
    pub timer: Option<i32>,
    pub created_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Workout
///
/// A training plan assigned to one or more students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Workout {
    pub id: Uuid,
    pub name_plan: String,
    pub students: Vec<Uuid>,
    /// Ordered exercise references.
    pub exercises: Vec<Uuid>,
    /// Exercises a student has marked done.
    pub completed_exercises: Vec<Uuid>,
    pub created_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Diet
///
/// A daily nutrition plan for one student, with consumption counters that roll
/// over to zero on the first access of a new day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Diet {
    pub id: Uuid,
    pub name_plan: String,
    pub student: Uuid,
    /// Daily water target, in millilitres.
    pub water_target: f64,
    /// Daily calorie target, in kcal.
    pub calories_target: f64,
    pub water_count: f64,
    pub calories_count: f64,
    #[ts(type = "string")]
    pub last_reset: NaiveDate,
    pub created_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Diet {
    /// Zeroes the consumption counters when `today` is a different day from the
    /// last reset. Returns true when the plan changed and must be persisted.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.last_reset == today {
            return false;
        }
        self.water_count = 0.0;
        self.calories_count = 0.0;
        self.last_reset = today;
        true
    }
}

// --- Read Views (References Resolved) ---

/// UserSummary
///
/// The identity fields embedded where a plan names its owner or students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub username: String,
}

impl From<UserRecord> for UserSummary {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            username: user.username,
        }
    }
}

/// ExerciseSummary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ExerciseSummary {
    pub id: Uuid,
    pub name: String,
    pub machine: Option<String>,
    pub reps: i32,
    pub sets: i32,
    pub timer: Option<i32>,
}

impl From<Exercise> for ExerciseSummary {
    fn from(exercise: Exercise) -> Self {
        Self {
            id: exercise.id,
            name: exercise.name,
            machine: exercise.machine,
            reps: exercise.reps,
            sets: exercise.sets,
            timer: exercise.timer,
        }
    }
}

/// WorkoutView
///
/// A workout as returned by reads: the stored plan plus summaries of what its
/// references point at. Deleted exercises and accounts are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct WorkoutView {
    #[serde(flatten)]
    pub workout: Workout,
    /// In plan order.
    pub exercise_details: Vec<ExerciseSummary>,
    pub student_details: Vec<UserSummary>,
    pub creator: Option<UserSummary>,
}

/// DietView
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DietView {
    #[serde(flatten)]
    pub diet: Diet,
    pub student_details: Option<UserSummary>,
    pub creator: Option<UserSummary>,
}

/// Scoped
///
/// Documents whose visibility is decided by an owner and (optionally) a set of
/// recipient students.
pub trait Scoped {
    fn owner(&self) -> Uuid;
    fn has_recipient(&self, user_id: Uuid) -> bool;
    fn is_deleted(&self) -> bool;
}

impl Scoped for Exercise {
    fn owner(&self) -> Uuid {
        self.created_by
    }
    // Exercises are never shared directly with students.
    fn has_recipient(&self, _user_id: Uuid) -> bool {
        false
    }
    fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Scoped for Workout {
    fn owner(&self) -> Uuid {
        self.created_by
    }
    fn has_recipient(&self, user_id: Uuid) -> bool {
        self.students.contains(&user_id)
    }
    fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Scoped for Diet {
    fn owner(&self) -> Uuid {
        self.created_by
    }
    fn has_recipient(&self, user_id: Uuid) -> bool {
        self.student == user_id
    }
    fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// --- Request Payloads (Input Schemas) ---

/// SignupRequest
///
/// Public registration payload (POST /api/users). `username` falls back to the
/// local part of the email when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "username cannot be empty"))]
    pub username: Option<String>,
}

/// ReplaceUserRequest
///
/// Full profile replacement (PUT /api/users/{id}). The role is not part of the
/// allow-list and cannot be changed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct ReplaceUserRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "password cannot be empty"))]
    pub password: Option<String>,
}

/// PatchUserRequest
///
/// Partial profile update (PATCH /api/users/{id}).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct PatchUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "email is not a valid address"))]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "username cannot be empty"))]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "password cannot be empty"))]
    pub password: Option<String>,
}

impl PatchUserRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.username.is_none() && self.password.is_none()
    }
}

/// ExerciseRequest
///
/// Create (POST) and full replace (PUT) payload for an exercise.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct ExerciseRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    #[validate(range(min = 0, message = "reps must not be negative"))]
    pub reps: i32,
    #[validate(range(min = 0, message = "sets must not be negative"))]
    pub sets: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "timer must not be negative"))]
    pub timer: Option<i32>,
}

/// PatchExerciseRequest
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct PatchExerciseRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "reps must not be negative"))]
    pub reps: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "sets must not be negative"))]
    pub sets: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "timer must not be negative"))]
    pub timer: Option<i32>,
}

impl PatchExerciseRequest {
    pub fn provided_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.machine.is_some() {
            fields.push("machine");
        }
        if self.reps.is_some() {
            fields.push("reps");
        }
        if self.sets.is_some() {
            fields.push("sets");
        }
        if self.timer.is_some() {
            fields.push("timer");
        }
        fields
    }
}

/// WorkoutRequest
///
/// Create (POST) and full replace (PUT) payload for a workout plan. References are
/// taken as raw strings so an invalid one can be reported verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct WorkoutRequest {
    #[validate(length(min = 1, message = "name_plan is required"))]
    pub name_plan: String,
    #[serde(default)]
    pub students: Vec<String>,
    /// Shorthand for a single-student plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, alias = "workouts")]
    pub exercises: Vec<String>,
}

/// PatchWorkoutRequest
///
/// Partial workout update. Students may only send `completed_exercises`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct PatchWorkoutRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "name_plan cannot be empty"))]
    pub name_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students: Option<Vec<String>>,
    #[serde(default, alias = "workouts", skip_serializing_if = "Option::is_none")]
    pub exercises: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_exercises: Option<Vec<String>>,
}

impl PatchWorkoutRequest {
    /// Names of the fields present in the payload.
    pub fn provided_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name_plan.is_some() {
            fields.push("name_plan");
        }
        if self.students.is_some() {
            fields.push("students");
        }
        if self.exercises.is_some() {
            fields.push("exercises");
        }
        if self.completed_exercises.is_some() {
            fields.push("completed_exercises");
        }
        fields
    }
}

/// DietRequest
///
/// Create (POST) and full replace (PUT) payload for a diet plan.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct DietRequest {
    pub student: String,
    #[validate(length(min = 1, message = "name_plan is required"))]
    pub name_plan: String,
    #[serde(alias = "water_meta")]
    #[validate(range(min = 0.0, message = "water_target must not be negative"))]
    pub water_target: f64,
    #[serde(alias = "calories_meta")]
    #[validate(range(min = 0.0, message = "calories_target must not be negative"))]
    pub calories_target: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "water_count must not be negative"))]
    pub water_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "calories_count must not be negative"))]
    pub calories_count: Option<f64>,
}

/// PatchDietRequest
///
/// Partial diet update. Students may only send the two consumption counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct PatchDietRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "name_plan cannot be empty"))]
    pub name_plan: Option<String>,
    #[serde(default, alias = "water_meta", skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "water_target must not be negative"))]
    pub water_target: Option<f64>,
    #[serde(default, alias = "calories_meta", skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "calories_target must not be negative"))]
    pub calories_target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "water_count must not be negative"))]
    pub water_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "calories_count must not be negative"))]
    pub calories_count: Option<f64>,
}

impl PatchDietRequest {
    pub fn provided_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.student.is_some() {
            fields.push("student");
        }
        if self.name_plan.is_some() {
            fields.push("name_plan");
        }
        if self.water_target.is_some() {
            fields.push("water_target");
        }
        if self.calories_target.is_some() {
            fields.push("calories_target");
        }
        if self.water_count.is_some() {
            fields.push("water_count");
        }
        if self.calories_count.is_some() {
            fields.push("calories_count");
        }
        fields
    }
}

/// IntakeRequest
///
/// Amounts to add to today's consumption counters (POST /api/diets/{id}/intake).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct IntakeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "water must not be negative"))]
    pub water: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "calories must not be negative"))]
    pub calories: Option<f64>,
}

/// ListQuery
///
/// Optional refinements for workout and diet listings. Ignored for students.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListQuery {
    /// Only plans assigned to this student id.
    pub student: Option<String>,
    /// Only plans created by this user id.
    pub created_by: Option<String>,
}

// --- Session Schemas ---

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// SessionUser
///
/// The identity snapshot carried by a session token, as shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub username: String,
    #[serde(rename = "type")]
    pub role: Role,
}

/// SessionResponse
///
/// Returned by login and by a session refresh.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionResponse {
    pub token: String,
    pub user: SessionUser,
    /// Unix timestamp after which the token is rejected.
    pub expires_at: u64,
}

/// SessionUpdateRequest
///
/// Claims that may change mid-session after a profile edit. Id and role are
/// deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct SessionUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "email is not a valid address"))]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "username cannot be empty"))]
    pub username: Option<String>,
}
