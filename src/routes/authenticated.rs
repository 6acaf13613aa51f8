use crate::{
    AppState,
    handlers::{diets, exercises, session, users, workouts},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every route here sits behind `auth_middleware`, so a missing or invalid
/// token is answered with 401 before any handler or storage call runs. What a
/// caller may then see or change is decided per request by the policy.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Session ---
        // GET returns the token's claims; PATCH re-signs them after a profile edit.
        .route(
            "/api/auth/session",
            get(session::get_session).patch(session::refresh_session),
        )
        // --- Users ---
        // Listing is closed to students; by-id routes are self-only.
        .route("/api/users", get(users::list_users))
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .put(users::replace_user)
                .patch(users::patch_user)
                .delete(users::delete_user),
        )
        // --- Exercises ---
        .route(
            "/api/exercises",
            get(exercises::list_exercises).post(exercises::create_exercise),
        )
        .route(
            "/api/exercises/{id}",
            get(exercises::get_exercise)
                .put(exercises::replace_exercise)
                .patch(exercises::patch_exercise)
                .delete(exercises::delete_exercise),
        )
        // --- Workouts ---
        // GET /api/workouts?student=...&created_by=...
        .route(
            "/api/workouts",
            get(workouts::list_workouts).post(workouts::create_workout),
        )
        .route(
            "/api/workouts/{id}",
            get(workouts::get_workout)
                .put(workouts::replace_workout)
                .patch(workouts::patch_workout)
                .delete(workouts::delete_workout),
        )
        // --- Diets ---
        .route(
            "/api/diets",
            get(diets::list_diets).post(diets::create_diet),
        )
        .route(
            "/api/diets/{id}",
            get(diets::get_diet)
                .put(diets::replace_diet)
                .patch(diets::patch_diet)
                .delete(diets::delete_diet),
        )
        // POST /api/diets/{id}/intake
        // The assigned student adds to today's counters.
        .route("/api/diets/{id}/intake", post(diets::log_intake))
}
