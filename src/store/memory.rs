//! In-process [`BookingStore`]. Nothing survives a restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

use super::BookingStore;
use crate::error::{BookingError, Result};
use crate::model::{Booking, BookingView, Club, NewBooking, NewUser, Role, User};

/// `(location_id, slot_id, date)`
type SlotKey = (String, i32, NaiveDate);

#[derive(Default)]
struct Tables {
    clubs: BTreeMap<i64, Club>,
    users: BTreeMap<i64, User>,
    bookings: BTreeMap<i64, Booking>,
    by_slot: HashMap<SlotKey, i64>,
    next_club_id: i64,
    next_user_id: i64,
    next_booking_id: i64,
}

impl Tables {
    fn view(&self, booking: &Booking) -> BookingView {
        BookingView {
            booking: booking.clone(),
            club_name: self
                .clubs
                .get(&booking.club_id)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
        }
    }

    fn has_admin(&self) -> bool {
        self.users
            .values()
            .any(|u| matches!(u.role, Role::ClubAdmin | Role::SuperAdmin))
    }

    fn insert_club(&mut self, name: &str) -> Result<Club> {
        if self.clubs.values().any(|c| c.name == name) {
            return Err(BookingError::InvalidInput(format!(
                "club '{name}' already exists"
            )));
        }
        self.next_club_id += 1;
        let club = Club {
            id: self.next_club_id,
            name: name.to_string(),
        };
        self.clubs.insert(club.id, club.clone());
        Ok(club)
    }

    fn insert_user(&mut self, user: NewUser) -> Result<User> {
        if self.users.values().any(|u| u.username == user.username) {
            return Err(BookingError::InvalidInput(format!(
                "user '{}' already exists",
                user.username
            )));
        }
        if let Some(club_id) = user.club_id {
            if !self.clubs.contains_key(&club_id) {
                return Err(BookingError::NotFound(format!("club {club_id}")));
            }
        }
        self.next_user_id += 1;
        let user = User {
            id: self.next_user_id,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            club_id: user.club_id,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn club_count(&self, club_id: i64, date: NaiveDate) -> i64 {
        self.bookings
            .values()
            .filter(|b| b.club_id == club_id && b.date == date)
            .count() as i64
    }
}

/// Single mutex over all tables: the quota check and the insert see the same state.
#[derive(Default)]
pub struct MemoryBookingStore {
    tables: Mutex<Tables>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn is_seeded(&self) -> Result<bool> {
        Ok(self.tables.lock().await.has_admin())
    }

    async fn seed(&self, club_name: &str, admin: NewUser) -> Result<Option<(Club, User)>> {
        let mut t = self.tables.lock().await;
        if t.has_admin() {
            return Ok(None);
        }
        if t.users.values().any(|u| u.username == admin.username) {
            return Err(BookingError::InvalidInput(format!(
                "user '{}' already exists",
                admin.username
            )));
        }

        let existing = t.clubs.values().find(|c| c.name == club_name).cloned();
        let club = match existing {
            Some(club) => club,
            None => t.insert_club(club_name)?,
        };
        let user = t.insert_user(NewUser {
            club_id: Some(club.id),
            ..admin
        })?;
        Ok(Some((club, user)))
    }

    async fn create_club(&self, name: &str) -> Result<Club> {
        self.tables.lock().await.insert_club(name)
    }

    async fn get_club(&self, club_id: i64) -> Result<Option<Club>> {
        Ok(self.tables.lock().await.clubs.get(&club_id).cloned())
    }

    async fn find_club_by_name(&self, name: &str) -> Result<Option<Club>> {
        let t = self.tables.lock().await;
        Ok(t.clubs.values().find(|c| c.name == name).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.tables.lock().await.insert_user(user)
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn count_club_bookings(&self, club_id: i64, date: NaiveDate) -> Result<i64> {
        Ok(self.tables.lock().await.club_count(club_id, date))
    }

    async fn insert_booking(&self, booking: NewBooking, quota: Option<i64>) -> Result<Booking> {
        let mut t = self.tables.lock().await;

        if !t.clubs.contains_key(&booking.club_id) {
            return Err(BookingError::NotFound(format!("club {}", booking.club_id)));
        }
        if let Some(limit) = quota {
            if t.club_count(booking.club_id, booking.date) >= limit {
                return Err(BookingError::QuotaExceeded);
            }
        }

        let key = (booking.location_id.clone(), booking.slot_id, booking.date);
        if t.by_slot.contains_key(&key) {
            return Err(BookingError::SlotTaken);
        }

        t.next_booking_id += 1;
        let stored = Booking {
            id: t.next_booking_id,
            event_name: booking.event_name,
            summary: booking.summary,
            location_id: booking.location_id,
            slot_id: booking.slot_id,
            date: booking.date,
            club_id: booking.club_id,
            created_at: Utc::now(),
        };
        t.by_slot.insert(key, stored.id);
        t.bookings.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn bookings_for_slot(&self, date: NaiveDate, slot_id: i32) -> Result<Vec<BookingView>> {
        let t = self.tables.lock().await;
        let mut views: Vec<BookingView> = t
            .bookings
            .values()
            .filter(|b| b.date == date && b.slot_id == slot_id)
            .map(|b| t.view(b))
            .collect();
        views.sort_by(|a, b| a.booking.location_id.cmp(&b.booking.location_id));
        Ok(views)
    }

    async fn bookings_for_date(&self, date: NaiveDate) -> Result<Vec<BookingView>> {
        let t = self.tables.lock().await;
        let mut views: Vec<BookingView> = t
            .bookings
            .values()
            .filter(|b| b.date == date)
            .map(|b| t.view(b))
            .collect();
        views.sort_by(|a, b| {
            (a.booking.slot_id, &a.booking.location_id)
                .cmp(&(b.booking.slot_id, &b.booking.location_id))
        });
        Ok(views)
    }
}
