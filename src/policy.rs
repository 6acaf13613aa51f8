//! Authorization policy.
//!
//! Turns an authenticated identity plus a requested operation into either a
//! storage `Scope` (the documents the operation may touch) or a `Denial`. The
//! functions here are pure; services feed the result into the repository.

use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{Role, Scoped},
};

/// Resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Exercise,
    Workout,
    Diet,
}

impl Resource {
    pub fn label(&self) -> &'static str {
        match self {
            Resource::Exercise => "Exercise",
            Resource::Workout => "Workout",
            Resource::Diet => "Diet",
        }
    }
}

/// Action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Replace,
    Patch,
    Delete,
    /// Adding to a diet's consumption counters.
    LogIntake,
}

/// Scope
///
/// Restriction applied to every storage query and mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Documents whose `created_by` is this user.
    Owner(Uuid),
    /// Documents that list this user as a recipient student.
    Recipient(Uuid),
    /// Matches nothing.
    Nothing,
}

impl Scope {
    /// In-process evaluation of the scope, mirroring the SQL the Postgres
    /// repository builds. Soft-deleted documents are never admitted.
    pub fn admits<T: Scoped>(&self, doc: &T) -> bool {
        if doc.is_deleted() {
            return false;
        }
        match *self {
            Scope::Owner(id) => doc.owner() == id,
            Scope::Recipient(id) => doc.has_recipient(id),
            Scope::Nothing => false,
        }
    }
}

/// Denial
///
/// The role may not perform the action at all. `visible` is what the caller may
/// still read; a denied by-id request answers 403 only for documents inside it,
/// and 404 otherwise, so existence never leaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denial {
    pub visible: Scope,
}

/// Read scope for a role on a resource.
fn read_scope(user: &AuthUser, resource: Resource) -> Scope {
    match (resource, user.role) {
        (Resource::Exercise, Role::Student) => Scope::Nothing,
        (Resource::Workout | Resource::Diet, Role::Student) => Scope::Recipient(user.id),
        _ => Scope::Owner(user.id),
    }
}

/// The role that creates, replaces and deletes documents of this kind.
fn managing_role(resource: Resource) -> Role {
    match resource {
        Resource::Exercise | Resource::Workout => Role::Trainer,
        Resource::Diet => Role::Nutritionist,
    }
}

/// authorize
///
/// The policy table. Returns the scope an allowed action runs under.
pub fn authorize(user: &AuthUser, resource: Resource, action: Action) -> Result<Scope, Denial> {
    let read = read_scope(user, resource);
    let manager = user.role == managing_role(resource);
    let deny = Err(Denial { visible: read });

    match action {
        Action::Read => Ok(read),
        Action::Create | Action::Replace | Action::Delete => {
            if manager {
                Ok(Scope::Owner(user.id))
            } else {
                deny
            }
        }
        Action::Patch => match resource {
            // Exercises have no recipients; patching is an owner affair.
            Resource::Exercise if !manager => deny,
            _ => Ok(read),
        },
        Action::LogIntake => match (resource, user.role) {
            (Resource::Diet, Role::Student) => Ok(read),
            _ => deny,
        },
    }
}

/// Fields a role may send in a PATCH for this resource.
pub fn patchable_fields(resource: Resource, role: Role) -> &'static [&'static str] {
    match (resource, role) {
        (Resource::Workout, Role::Student) => &["completed_exercises"],
        (Resource::Workout, _) => &["name_plan", "students", "exercises", "completed_exercises"],
        (Resource::Diet, Role::Student) => &["water_count", "calories_count"],
        (Resource::Diet, _) => &[
            "student",
            "name_plan",
            "water_target",
            "calories_target",
            "water_count",
            "calories_count",
        ],
        (Resource::Exercise, _) => &["name", "machine", "reps", "sets", "timer"],
    }
}

/// Rejects any provided field outside the role's allow-list, naming the first one.
pub fn check_patch_fields(
    resource: Resource,
    role: Role,
    provided: &[&'static str],
) -> Result<(), AppError> {
    if provided.is_empty() {
        return Err(AppError::Validation("no fields to update".to_string()));
    }
    let allowed = patchable_fields(resource, role);
    match provided.iter().find(|field| !allowed.contains(field)) {
        Some(field) => Err(AppError::Validation(format!(
            "field `{field}` cannot be updated by a {role}"
        ))),
        None => Ok(()),
    }
}

// --- Users ---

/// Listing the directory of users is closed to students.
pub fn authorize_user_listing(user: &AuthUser) -> Result<(), AppError> {
    if user.role == Role::Student {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Users may only read, change or delete their own record.
pub fn authorize_self(user: &AuthUser, target: Uuid) -> Result<(), AppError> {
    if user.id != target {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

// --- References ---

/// Parses one identity/document reference, naming it on failure.
pub fn parse_ref(value: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::Validation(format!("invalid reference `{value}`")))
}

/// Parses every reference or none: the first malformed value rejects the whole list.
pub fn parse_refs(values: &[String]) -> Result<Vec<Uuid>, AppError> {
    values.iter().map(|v| parse_ref(v)).collect()
}
