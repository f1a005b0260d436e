//! POST /api/book - create a booking (club_admin, super_admin).
//!
//! 201 on success, 400 on bad input or when a club admin has used the daily
//! quota, 403 for other roles, 409 when the location/slot/date is taken.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;

use crate::error::{BookingError, Result};
use crate::model::{BookingRequest, Role};
use crate::principal::Principal;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BookingCreated {
    pub message: String,
    pub booking_id: i64,
}

pub async fn create_booking(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: std::result::Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingCreated>)> {
    // Role gate runs before the body is looked at.
    principal.require_any_role(&Role::BOOKERS)?;
    let Json(request) = payload.map_err(|e| BookingError::InvalidInput(e.body_text()))?;

    let booking = state.service.book(&principal, &request).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingCreated {
            message: "Booking successful".to_string(),
            booking_id: booking.id,
        }),
    ))
}
