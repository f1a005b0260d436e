//! Booking persistence port and its adapters.
//!
//! - [`PgBookingStore`] - PostgreSQL via sqlx (production).
//! - [`MemoryBookingStore`] - process-local fallback when no database is
//!   configured, and the backing store for tests.
//!
//! Both adapters enforce the same two invariants on insert:
//! one booking per `(location_id, slot_id, date)`, and, when a quota is
//! passed, fewer than `quota` existing bookings for `(club_id, date)`.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{Booking, BookingView, Club, NewBooking, NewUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryBookingStore;
pub use postgres::PgBookingStore;

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Create tables and constraints if they don't exist yet.
    async fn initialize(&self) -> Result<()>;

    /// True once an admin account (club or super admin) exists.
    async fn is_seeded(&self) -> Result<bool>;

    /// Create the first club and its admin atomically.
    ///
    /// A club already named `club_name` is reused. Returns `None` without
    /// writing anything when an admin account already exists; concurrent
    /// callers seed at most once. `admin.club_id` is replaced by the club's id.
    async fn seed(&self, club_name: &str, admin: NewUser) -> Result<Option<(Club, User)>>;

    async fn create_club(&self, name: &str) -> Result<Club>;
    async fn get_club(&self, club_id: i64) -> Result<Option<Club>>;
    async fn find_club_by_name(&self, name: &str) -> Result<Option<Club>>;

    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn get_user(&self, user_id: i64) -> Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn count_club_bookings(&self, club_id: i64, date: NaiveDate) -> Result<i64>;

    /// Insert a booking.
    ///
    /// With `quota = Some(n)` the club must hold fewer than `n` bookings on
    /// that date, checked atomically with the insert
    /// (`BookingError::QuotaExceeded`). A taken `(location, slot, date)`
    /// yields `BookingError::SlotTaken`.
    async fn insert_booking(&self, booking: NewBooking, quota: Option<i64>) -> Result<Booking>;

    /// Bookings for one slot on one date, ordered by location.
    async fn bookings_for_slot(&self, date: NaiveDate, slot_id: i32) -> Result<Vec<BookingView>>;

    /// Every booking on a date, ordered by slot then location.
    async fn bookings_for_date(&self, date: NaiveDate) -> Result<Vec<BookingView>>;
}
