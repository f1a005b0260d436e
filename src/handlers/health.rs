//! GET /health - liveness plus the number of connected viewers.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "viewers": state.service.events().viewer_count(),
    }))
}
