//! Resource services.
//!
//! Each operation takes the acting `AuthUser` explicitly, asks the policy for a
//! scope, validates references, and only then touches the repository.

use std::future::Future;

use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    models::{ListQuery, Role},
    policy::{Denial, Resource, Scope, parse_ref},
    repository::{ListFilter, RepositoryError},
};

pub mod diets;
pub mod exercises;
pub mod users;
pub mod views;
pub mod workouts;

/// Resolves a by-id policy decision. On a denial, `lookup` fetches the document
/// under the caller's read scope: a document they can see answers 403, anything
/// else 404, so a denial never reveals that an unseen document exists.
pub(crate) async fn resolve<T, F, Fut>(
    decision: std::result::Result<Scope, Denial>,
    resource: Resource,
    lookup: F,
) -> Result<Scope>
where
    F: FnOnce(Scope) -> Fut,
    Fut: Future<Output = std::result::Result<Option<T>, RepositoryError>>,
{
    match decision {
        Ok(scope) => Ok(scope),
        Err(Denial { visible }) => match lookup(visible).await? {
            Some(_) => Err(AppError::Forbidden),
            None => Err(AppError::NotFound(resource.label())),
        },
    }
}

/// Create is role-gated with no document to look up.
pub(crate) fn creation_scope(decision: std::result::Result<Scope, Denial>) -> Result<Scope> {
    decision.map_err(|_| AppError::Forbidden)
}

/// Builds a list filter from the policy scope and the query refinements.
/// Students cannot refine; their scope already names them.
pub(crate) fn list_filter(actor: &AuthUser, scope: Scope, query: &ListQuery) -> Result<ListFilter> {
    let mut filter = ListFilter::scoped(scope);
    if actor.role == Role::Student {
        return Ok(filter);
    }
    filter.student = query.student.as_deref().map(parse_ref).transpose()?;
    filter.created_by = query.created_by.as_deref().map(parse_ref).transpose()?;
    Ok(filter)
}

/// Removes repeated ids, keeping the first occurrence.
pub(crate) fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}
