//! Postgres implementation of [`BookingStore`].
//!
//! All SQL is runtime-checked (sqlx::query, not sqlx::query!) so the crate
//! builds without a live database.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};

use super::BookingStore;
use crate::error::{BookingError, Result};
use crate::model::{Booking, BookingView, Club, NewBooking, NewUser, Role, User};

const SCHEMA_SQL: &str = include_str!("../../migrations/0001_init.sql");

/// Transaction-scoped advisory lock key serializing first-run seeding.
const SEED_LOCK_KEY: i64 = 0x636c_7562_7365_6564;

const ADMIN_EXISTS_SQL: &str =
    r#"SELECT EXISTS (SELECT 1 FROM users WHERE role IN ('club_admin', 'super_admin'))"#;

// ── Row types ────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct PgUserRow {
    id: i64,
    username: String,
    password_hash: String,
    role: String,
    club_id: Option<i64>,
}

impl TryFrom<PgUserRow> for User {
    type Error = BookingError;

    fn try_from(row: PgUserRow) -> Result<Self> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| anyhow!("user {} has unknown role '{}'", row.id, row.role))?;
        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role,
            club_id: row.club_id,
        })
    }
}

#[derive(Debug, FromRow)]
struct PgBookingRow {
    id: i64,
    event_name: String,
    summary: Option<String>,
    location_id: String,
    slot_id: i32,
    date: NaiveDate,
    club_id: i64,
    created_at: DateTime<Utc>,
}

impl From<PgBookingRow> for Booking {
    fn from(row: PgBookingRow) -> Self {
        Booking {
            id: row.id,
            event_name: row.event_name,
            summary: row.summary,
            location_id: row.location_id,
            slot_id: row.slot_id,
            date: row.date,
            club_id: row.club_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PgBookingViewRow {
    #[sqlx(flatten)]
    booking: PgBookingRow,
    club_name: String,
}

impl From<PgBookingViewRow> for BookingView {
    fn from(row: PgBookingViewRow) -> Self {
        BookingView {
            booking: row.booking.into(),
            club_name: row.club_name,
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_foreign_key_violation())
        .unwrap_or(false)
}

fn user_insert_error(e: sqlx::Error, user: &NewUser) -> BookingError {
    if is_unique_violation(&e) {
        BookingError::InvalidInput(format!("user '{}' already exists", user.username))
    } else if is_foreign_key_violation(&e) {
        BookingError::NotFound(format!("club {}", user.club_id.unwrap_or_default()))
    } else {
        e.into()
    }
}

const INSERT_USER_SQL: &str = r#"INSERT INTO users (username, password_hash, role, club_id)
   VALUES ($1, $2, $3, $4)
   RETURNING id, username, password_hash, role, club_id"#;

// ── PgBookingStore ───────────────────────────────────────────

#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn initialize(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        tracing::debug!("Booking schema ensured");
        Ok(())
    }

    async fn is_seeded(&self) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(ADMIN_EXISTS_SQL)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn seed(&self, club_name: &str, admin: NewUser) -> Result<Option<(Club, User)>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SEED_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let seeded = sqlx::query_scalar::<_, bool>(ADMIN_EXISTS_SQL)
            .fetch_one(&mut *tx)
            .await?;
        if seeded {
            return Ok(None);
        }

        // Reuse a club left behind without an admin.
        let (club_id, name) = sqlx::query_as::<_, (i64, String)>(
            r#"INSERT INTO clubs (name) VALUES ($1)
               ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
               RETURNING id, name"#,
        )
        .bind(club_name)
        .fetch_one(&mut *tx)
        .await?;

        let admin = NewUser {
            club_id: Some(club_id),
            ..admin
        };
        let row = sqlx::query_as::<_, PgUserRow>(INSERT_USER_SQL)
            .bind(&admin.username)
            .bind(&admin.password_hash)
            .bind(admin.role.as_str())
            .bind(admin.club_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| user_insert_error(e, &admin))?;
        let user = User::try_from(row)?;

        tx.commit().await?;
        Ok(Some((Club { id: club_id, name }, user)))
    }

    async fn create_club(&self, name: &str) -> Result<Club> {
        let row = sqlx::query_as::<_, (i64, String)>(
            r#"INSERT INTO clubs (name) VALUES ($1) RETURNING id, name"#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BookingError::InvalidInput(format!("club '{name}' already exists"))
            } else {
                e.into()
            }
        })?;
        Ok(Club {
            id: row.0,
            name: row.1,
        })
    }

    async fn get_club(&self, club_id: i64) -> Result<Option<Club>> {
        let row = sqlx::query_as::<_, (i64, String)>(r#"SELECT id, name FROM clubs WHERE id = $1"#)
            .bind(club_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| Club { id, name }))
    }

    async fn find_club_by_name(&self, name: &str) -> Result<Option<Club>> {
        let row =
            sqlx::query_as::<_, (i64, String)>(r#"SELECT id, name FROM clubs WHERE name = $1"#)
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, name)| Club { id, name }))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query_as::<_, PgUserRow>(INSERT_USER_SQL)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.club_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| user_insert_error(e, &user))?;
        row.try_into()
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, PgUserRow>(
            r#"SELECT id, username, password_hash, role, club_id FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, PgUserRow>(
            r#"SELECT id, username, password_hash, role, club_id FROM users WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn count_club_bookings(&self, club_id: i64, date: NaiveDate) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM bookings WHERE club_id = $1 AND date = $2"#,
        )
        .bind(club_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_booking(&self, booking: NewBooking, quota: Option<i64>) -> Result<Booking> {
        let mut tx = self.pool.begin().await?;

        // Lock the club row so concurrent bookings for the same club serialize
        // on the quota check below.
        let club = sqlx::query_scalar::<_, i64>(r#"SELECT id FROM clubs WHERE id = $1 FOR UPDATE"#)
            .bind(booking.club_id)
            .fetch_optional(&mut *tx)
            .await?;
        if club.is_none() {
            return Err(BookingError::NotFound(format!("club {}", booking.club_id)));
        }

        if let Some(limit) = quota {
            let held = sqlx::query_scalar::<_, i64>(
                r#"SELECT COUNT(*) FROM bookings WHERE club_id = $1 AND date = $2"#,
            )
            .bind(booking.club_id)
            .bind(booking.date)
            .fetch_one(&mut *tx)
            .await?;
            if held >= limit {
                return Err(BookingError::QuotaExceeded);
            }
        }

        let row = sqlx::query_as::<_, PgBookingRow>(
            r#"INSERT INTO bookings (event_name, summary, location_id, slot_id, date, club_id)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, event_name, summary, location_id, slot_id, date, club_id, created_at"#,
        )
        .bind(&booking.event_name)
        .bind(&booking.summary)
        .bind(&booking.location_id)
        .bind(booking.slot_id)
        .bind(booking.date)
        .bind(booking.club_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BookingError::SlotTaken
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn bookings_for_slot(&self, date: NaiveDate, slot_id: i32) -> Result<Vec<BookingView>> {
        let rows = sqlx::query_as::<_, PgBookingViewRow>(
            r#"SELECT b.id, b.event_name, b.summary, b.location_id, b.slot_id, b.date,
                      b.club_id, b.created_at, c.name AS club_name
               FROM bookings b
               JOIN clubs c ON c.id = b.club_id
               WHERE b.date = $1 AND b.slot_id = $2
               ORDER BY b.location_id"#,
        )
        .bind(date)
        .bind(slot_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn bookings_for_date(&self, date: NaiveDate) -> Result<Vec<BookingView>> {
        let rows = sqlx::query_as::<_, PgBookingViewRow>(
            r#"SELECT b.id, b.event_name, b.summary, b.location_id, b.slot_id, b.date,
                      b.club_id, b.created_at, c.name AS club_name
               FROM bookings b
               JOIN clubs c ON c.id = b.club_id
               WHERE b.date = $1
               ORDER BY b.slot_id, b.location_id"#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
