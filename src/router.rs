//! Router construction for the booking server.

use std::path::Path;

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers;
use crate::middleware::session::session_auth;
use crate::state::AppState;

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    // Routes that require a session
    let protected = Router::new()
        .route("/api/book", post(handlers::bookings::create_booking))
        .route("/api/me", get(handlers::auth::me))
        .layer(axum_mw::from_fn(session_auth))
        .layer(Extension(state.sessions.clone()));

    // Public routes (no auth)
    let public = Router::new()
        .route("/", get(handlers::static_files::serve_index))
        .route("/health", get(handlers::health::health))
        .route("/setup", get(handlers::setup::setup))
        .route("/api/login", post(handlers::auth::login))
        .route("/api/logout", post(handlers::auth::logout))
        .route(
            "/api/availability",
            get(handlers::availability::slot_availability),
        )
        .route(
            "/api/availability/day",
            get(handlers::availability::day_availability),
        )
        .route("/api/events", get(handlers::events::map_updates))
        .nest_service("/static", ServeDir::new(static_dir));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
