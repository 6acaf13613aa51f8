/// Router Module Index
///
/// Routes are split by whether they need a session. The split is enforced with
/// a route layer on the authenticated router, and every authenticated handler
/// also takes `AuthUser`, so a route moved to the wrong module still cannot run
/// anonymously.

/// Signup, login/logout and the health check.
pub mod public;

/// Everything behind `auth_middleware`.
pub mod authenticated;
