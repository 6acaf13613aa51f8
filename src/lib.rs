use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;
pub mod services;
pub mod session;

// Public and authenticated route trees.
pub mod routes;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use auth::{AuthUser, auth_middleware};
pub use config::AppConfig;
pub use credentials::PasswordHasher;
pub use error::AppError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use session::SessionManager;

/// ApiDoc
///
/// OpenAPI document for every `#[utoipa::path]` handler and request/response
/// schema. Served at `/api-docs/openapi.json` and browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::users::signup, handlers::users::list_users, handlers::users::get_user,
        handlers::users::replace_user, handlers::users::patch_user, handlers::users::delete_user,
        handlers::session::login, handlers::session::logout,
        handlers::session::get_session, handlers::session::refresh_session,
        handlers::exercises::create_exercise, handlers::exercises::list_exercises,
        handlers::exercises::get_exercise, handlers::exercises::replace_exercise,
        handlers::exercises::patch_exercise, handlers::exercises::delete_exercise,
        handlers::workouts::create_workout, handlers::workouts::list_workouts,
        handlers::workouts::get_workout, handlers::workouts::replace_workout,
        handlers::workouts::patch_workout, handlers::workouts::delete_workout,
        handlers::diets::create_diet, handlers::diets::list_diets, handlers::diets::get_diet,
        handlers::diets::replace_diet, handlers::diets::patch_diet, handlers::diets::log_intake,
        handlers::diets::delete_diet,
    ),
    components(
        schemas(
            models::Role, models::UserProfile, models::SignupRequest,
            models::ReplaceUserRequest, models::PatchUserRequest,
            models::Exercise, models::ExerciseRequest, models::PatchExerciseRequest,
            models::Workout, models::WorkoutRequest, models::PatchWorkoutRequest,
            models::Diet, models::DietRequest, models::PatchDietRequest, models::IntakeRequest,
            models::UserSummary, models::ExerciseSummary, models::WorkoutView, models::DietView,
            models::LoginRequest, models::SessionUser, models::SessionResponse,
            models::SessionUpdateRequest, error::ErrorBody,
        )
    ),
    tags(
        (name = "fitcoach", description = "Fitness coaching API for students, trainers and nutritionists")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Everything a request may need, shared immutably across all requests.
#[derive(Clone)]
pub struct AppState {
    /// Persistence behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Signs and verifies session tokens with the process-wide secret.
    pub sessions: SessionManager,
    /// Argon2id with the configured cost.
    pub hasher: PasswordHasher,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the token and hashing services from `config`.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Result<Self, AppError> {
        Ok(Self {
            repo,
            sessions: SessionManager::from_config(&config),
            hasher: PasswordHasher::from_config(&config)?,
            config,
        })
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(app_state: &AppState) -> SessionManager {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the route trees, the auth layer on the protected tree, the route
/// guard, and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // 3. Route guard: layered over every route and the fallback, so
        // unknown page paths are redirected to the login page too.
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            guard::route_guard,
        ))
        .with_state(state);

    // 4. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer`, carrying the request id so every log line of one
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
