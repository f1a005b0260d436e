//! Club room/slot booking server.
//!
//! Clubs log in, look at a location × slot grid for a date, and book free
//! cells. Two rules guard every booking:
//!
//! - one booking per `(location_id, slot_id, date)`, held by a unique
//!   constraint in the store;
//! - a club admin's club may hold at most [`model::DAILY_BOOKING_LIMIT`]
//!   bookings per date. Super admins are exempt.
//!
//! Successful bookings are pushed to connected browsers over SSE
//! (`/api/events`), best effort.

pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod middleware;
pub mod model;
pub mod password;
pub mod principal;
pub mod router;
pub mod service;
pub mod shutdown;
pub mod state;
pub mod store;

pub use error::{BookingError, Result};
pub use router::build_router;
pub use service::BookingService;
pub use state::AppState;
