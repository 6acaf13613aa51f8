//! HTTP handlers.
//!
//! Thin adapters: extract, call the matching service with the acting user, and
//! wrap the result. All authorization lives in the services and the policy.

use chrono::{NaiveDate, Utc};

pub mod diets;
pub mod exercises;
pub mod session;
pub mod users;
pub mod workouts;

/// health
///
/// [Public Route] Liveness check for load balancers.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// The calendar day diet counters are measured against. UTC, so every
/// instance agrees on when a day ends.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
