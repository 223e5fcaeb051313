use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token. Static files under `/uploads` are
/// mounted separately in `create_router`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        // GET /health
        // Liveness probe for load balancers; never touches the database.
        .route("/health", get(handlers::health_check))
        // POST /auth/register
        // JSON body; creates a user with the requested role (default 'user').
        .route("/auth/register", post(handlers::auth::register))
        // POST /auth/login
        // Form-encoded credentials in, bearer token out.
        .route("/auth/login", post(handlers::auth::login))
}
