//! Availability grid endpoints (public).
//!
//! GET /api/availability?date=YYYY-MM-DD&slot_id=N - bookings for one slot
//! GET /api/availability/day?date=YYYY-MM-DD       - every slot for a date

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::{BookingError, Result};
use crate::model::{parse_date, parse_slot};
use crate::service::{DayGrid, SlotAvailability};
use crate::state::AppState;

/// Parameters arrive as raw strings so malformed values get a JSON 400
/// instead of axum's plain-text rejection.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<String>,
    pub slot_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: Option<String>,
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| BookingError::InvalidInput(format!("{name} is required")))
}

pub async fn slot_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<SlotAvailability>> {
    let date = parse_date(required(&query.date, "date")?)?;
    let slot_id = parse_slot(required(&query.slot_id, "slot_id")?)?;
    Ok(Json(state.service.availability(date, slot_id).await?))
}

pub async fn day_availability(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<Json<DayGrid>> {
    let date = parse_date(required(&query.date, "date")?)?;
    Ok(Json(state.service.day_grid(date).await?))
}
