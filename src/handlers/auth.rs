//! Session endpoints.
//!
//! POST /api/login   - verify credentials, issue session token + cookie
//! POST /api/logout  - expire the session cookie
//! GET  /api/me      - current principal (protected)

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};
use crate::middleware::session::{clear_session_cookie, session_cookie};
use crate::model::Role;
use crate::principal::Principal;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub role: Role,
    /// Home club name, or "Admin" for users without one.
    pub club: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub club_id: Option<i64>,
    pub club: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload.map_err(|e| BookingError::InvalidInput(e.body_text()))?;

    let (user, club) = state.service.login(&req.username, &req.password).await?;
    let token = state.sessions.issue(&user)?;
    let cookie = session_cookie(&token, state.sessions.ttl());

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            message: "Logged in".to_string(),
            role: user.role,
            club: club.map(|c| c.name).unwrap_or_else(|| "Admin".to_string()),
            token,
        }),
    ))
}

pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(serde_json::json!({ "message": "Logged out" })),
    )
}

pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<MeResponse>> {
    let club = match principal.club_id {
        Some(id) => state.service.store().get_club(id).await?.map(|c| c.name),
        None => None,
    };
    Ok(Json(MeResponse {
        user_id: principal.user_id,
        username: principal.username,
        role: principal.role,
        club_id: principal.club_id,
        club,
    }))
}
