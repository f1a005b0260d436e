//! GET /setup - idempotent first-run initialization.
//!
//! Creates the schema if needed and, when no club exists yet, seeds the
//! default club with a club admin account.

use axum::extract::State;

use crate::error::Result;
use crate::service::SetupOutcome;
use crate::state::AppState;

pub async fn setup(State(state): State<AppState>) -> Result<&'static str> {
    match state.service.setup(&state.seed).await? {
        SetupOutcome::Initialized => Ok("Database initialized with admin user!"),
        SetupOutcome::AlreadyInitialized => Ok("Database already initialized."),
    }
}
