//! Booking operations shared by the HTTP handlers and the CLI.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{BookingError, Result};
use crate::events::{BookingEvents, MapUpdate};
use crate::model::{
    check_club_name, check_slot, check_username, AvailabilityEntry, Booking, BookingRequest, Club,
    NewUser, Role, User, DAILY_BOOKING_LIMIT,
};
use crate::password::{hash_password, verify_password, DEFAULT_PASSWORD_COST};
use crate::principal::Principal;
use crate::store::BookingStore;

/// location_id → entry
pub type SlotAvailability = BTreeMap<String, AvailabilityEntry>;

/// slot_id → location_id → entry
pub type DayGrid = BTreeMap<i32, SlotAvailability>;

/// Initial data written by `/setup` and `init-db`.
#[derive(Debug, Clone)]
pub struct SetupSeed {
    pub club_name: String,
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for SetupSeed {
    fn default() -> Self {
        Self {
            club_name: "ACM Amity".to_string(),
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    Initialized,
    AlreadyInitialized,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    events: BookingEvents,
    password_cost: u32,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>, events: BookingEvents) -> Self {
        Self {
            store,
            events,
            password_cost: DEFAULT_PASSWORD_COST,
        }
    }

    /// bcrypt cost for hashes created from now on. Existing hashes keep theirs.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    pub fn store(&self) -> &Arc<dyn BookingStore> {
        &self.store
    }

    pub fn events(&self) -> &BookingEvents {
        &self.events
    }

    // ── Auth ─────────────────────────────────────────────────

    pub async fn login(&self, username: &str, password: &str) -> Result<(User, Option<Club>)> {
        let found = self.store.find_user_by_username(username.trim()).await?;
        let verified = match &found {
            Some(user) => check_password(password, &user.password_hash).await?,
            None => false,
        };
        let user = found.filter(|_| verified).ok_or_else(|| {
            tracing::info!(username, "Login failed");
            BookingError::InvalidCredentials
        })?;

        let club = match user.club_id {
            Some(id) => self.store.get_club(id).await?,
            None => None,
        };
        tracing::info!(user = %user.username, role = %user.role, "Logged in");
        Ok((user, club))
    }

    // ── Availability ─────────────────────────────────────────

    pub async fn availability(&self, date: NaiveDate, slot_id: i32) -> Result<SlotAvailability> {
        let slot_id = check_slot(slot_id)?;
        let views = self.store.bookings_for_slot(date, slot_id).await?;
        Ok(views
            .iter()
            .map(|v| (v.booking.location_id.clone(), AvailabilityEntry::from(v)))
            .collect())
    }

    pub async fn day_grid(&self, date: NaiveDate) -> Result<DayGrid> {
        let mut grid = DayGrid::new();
        for view in self.store.bookings_for_date(date).await? {
            grid.entry(view.booking.slot_id)
                .or_default()
                .insert(view.booking.location_id.clone(), AvailabilityEntry::from(&view));
        }
        Ok(grid)
    }

    pub async fn can_club_book(&self, club_id: i64, date: NaiveDate) -> Result<bool> {
        Ok(self.store.count_club_bookings(club_id, date).await? < DAILY_BOOKING_LIMIT)
    }

    // ── Booking ──────────────────────────────────────────────

    /// Create a booking on behalf of `principal` and broadcast it.
    ///
    /// Club admins are held to [`DAILY_BOOKING_LIMIT`] per date; super admins
    /// are not.
    pub async fn book(&self, principal: &Principal, request: &BookingRequest) -> Result<Booking> {
        principal.require_any_role(&Role::BOOKERS)?;
        let club_id = principal.booking_club(request.club_id)?;
        let new_booking = request.validate(club_id)?;

        let club = self
            .store
            .get_club(club_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("club {club_id}")))?;

        let quota = principal
            .has_role(Role::ClubAdmin)
            .then_some(DAILY_BOOKING_LIMIT);

        let booking = self
            .store
            .insert_booking(new_booking, quota)
            .await
            .inspect_err(|e| {
                tracing::info!(user = %principal.username, club = %club.name, "Booking refused: {e}")
            })?;

        tracing::info!(
            booking_id = booking.id,
            club = %club.name,
            location = %booking.location_id,
            slot = booking.slot_id,
            date = %booking.date,
            "Booked"
        );
        self.events.publish(MapUpdate::booked(&booking, &club.name));
        Ok(booking)
    }

    // ── Administration ───────────────────────────────────────

    /// Ensure the schema exists and seed the first club and admin once.
    ///
    /// The club and its admin are written together; a store holding a club
    /// but no admin account is still treated as uninitialized.
    pub async fn setup(&self, seed: &SetupSeed) -> Result<SetupOutcome> {
        self.store.initialize().await?;
        if self.store.is_seeded().await? {
            return Ok(SetupOutcome::AlreadyInitialized);
        }

        let club_name = check_club_name(&seed.club_name)?;
        let admin = NewUser {
            username: check_username(&seed.admin_username)?.to_string(),
            password_hash: self.new_password_hash(&seed.admin_password).await?,
            role: Role::ClubAdmin,
            club_id: None,
        };

        let Some((club, admin)) = self.store.seed(club_name, admin).await? else {
            return Ok(SetupOutcome::AlreadyInitialized);
        };
        tracing::info!(club = %club.name, admin = %admin.username, "Seeded initial data");
        Ok(SetupOutcome::Initialized)
    }

    pub async fn add_club(&self, name: &str) -> Result<Club> {
        let name = check_club_name(name)?;
        self.store.create_club(name).await
    }

    pub async fn add_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
        club_name: Option<&str>,
    ) -> Result<User> {
        let username = check_username(username)?;

        let club_id = match club_name {
            Some(name) => Some(
                self.store
                    .find_club_by_name(name.trim())
                    .await?
                    .ok_or_else(|| BookingError::NotFound(format!("club '{name}'")))?
                    .id,
            ),
            None => None,
        };
        if role == Role::ClubAdmin && club_id.is_none() {
            return Err(BookingError::InvalidInput(
                "club admins need a home club".into(),
            ));
        }

        let password_hash = self.new_password_hash(password).await?;
        self.store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
                role,
                club_id,
            })
            .await
    }

    async fn new_password_hash(&self, password: &str) -> Result<String> {
        if password.is_empty() {
            return Err(BookingError::InvalidInput("password is required".into()));
        }
        let password = password.to_string();
        let cost = self.password_cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| BookingError::Internal(e.into()))?
    }
}

async fn check_password(password: &str, stored: &str) -> Result<bool> {
    let (password, stored) = (password.to_string(), stored.to_string());
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| BookingError::Internal(e.into()))
}
