//! Domain types: clubs, users, bookings, and request validation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// Number of bookable time slots per day. Slot ids run `1..=SLOT_COUNT`.
pub const SLOT_COUNT: i32 = 5;

/// Maximum bookings a club admin may hold for a single date.
pub const DAILY_BOOKING_LIMIT: i64 = 2;

pub const MAX_EVENT_NAME_LEN: usize = 100;
pub const MAX_LOCATION_ID_LEN: usize = 50;
pub const MAX_CLUB_NAME_LEN: usize = 100;
pub const MAX_USERNAME_LEN: usize = 50;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Role ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    ClubAdmin,
    SuperAdmin,
}

impl Role {
    /// Roles allowed to create bookings.
    pub const BOOKERS: [Role; 2] = [Role::ClubAdmin, Role::SuperAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::ClubAdmin => "club_admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "club_admin" => Some(Self::ClubAdmin),
            "super_admin" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    pub fn can_book(&self) -> bool {
        Self::BOOKERS.contains(self)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Entities ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub club_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub club_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub event_name: String,
    pub summary: Option<String>,
    pub location_id: String,
    pub slot_id: i32,
    pub date: NaiveDate,
    pub club_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A validated booking ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub event_name: String,
    pub summary: Option<String>,
    pub location_id: String,
    pub slot_id: i32,
    pub date: NaiveDate,
    pub club_id: i64,
}

/// A booking joined with its club's name, as returned by availability queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingView {
    pub booking: Booking,
    pub club_name: String,
}

/// One cell of the availability grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    pub status: String,
    pub club: String,
    pub event: String,
    pub summary: Option<String>,
}

impl From<&BookingView> for AvailabilityEntry {
    fn from(view: &BookingView) -> Self {
        Self {
            status: "booked".to_string(),
            club: view.club_name.clone(),
            event: view.booking.event_name.clone(),
            summary: view.booking.summary.clone(),
        }
    }
}

// ── Requests ─────────────────────────────────────────────────

/// Body of `POST /api/book`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub event_name: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub location_id: String,
    pub slot_id: i32,
    pub date: String,
    /// Only honoured for super admins; club admins always book for their home club.
    #[serde(default)]
    pub club_id: Option<i64>,
}

impl BookingRequest {
    /// Check field bounds and produce an insertable booking for `club_id`.
    pub fn validate(&self, club_id: i64) -> Result<NewBooking> {
        let event_name = self.event_name.trim();
        if event_name.is_empty() {
            return Err(BookingError::InvalidInput("event_name is required".into()));
        }
        if event_name.chars().count() > MAX_EVENT_NAME_LEN {
            return Err(BookingError::InvalidInput(format!(
                "event_name exceeds {MAX_EVENT_NAME_LEN} characters"
            )));
        }

        let location_id = self.location_id.trim();
        if location_id.is_empty() {
            return Err(BookingError::InvalidInput("location_id is required".into()));
        }
        if location_id.chars().count() > MAX_LOCATION_ID_LEN {
            return Err(BookingError::InvalidInput(format!(
                "location_id exceeds {MAX_LOCATION_ID_LEN} characters"
            )));
        }

        let summary = self
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(NewBooking {
            event_name: event_name.to_string(),
            summary,
            location_id: location_id.to_string(),
            slot_id: check_slot(self.slot_id)?,
            date: parse_date(&self.date)?,
            club_id,
        })
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| BookingError::InvalidInput(format!("date '{raw}' is not YYYY-MM-DD")))
}

pub fn parse_slot(raw: &str) -> Result<i32> {
    let slot = raw
        .trim()
        .parse::<i32>()
        .map_err(|_| BookingError::InvalidInput(format!("slot_id '{raw}' is not a number")))?;
    check_slot(slot)
}

pub fn check_slot(slot: i32) -> Result<i32> {
    if (1..=SLOT_COUNT).contains(&slot) {
        Ok(slot)
    } else {
        Err(BookingError::InvalidInput(format!(
            "slot_id must be between 1 and {SLOT_COUNT}"
        )))
    }
}

pub fn check_club_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_CLUB_NAME_LEN {
        return Err(BookingError::InvalidInput(format!(
            "club name must be 1-{MAX_CLUB_NAME_LEN} characters"
        )));
    }
    Ok(name)
}

pub fn check_username(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_USERNAME_LEN {
        return Err(BookingError::InvalidInput(format!(
            "username must be 1-{MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(name)
}
