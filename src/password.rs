//! bcrypt password hashes.
//!
//! Hashing is CPU-bound; async callers run these on the blocking pool.

use anyhow::anyhow;

use crate::error::{BookingError, Result};

/// Work factor for new hashes unless configured otherwise.
pub const DEFAULT_PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;

/// Cheapest cost bcrypt accepts. Tests use it to stay fast.
pub const MIN_PASSWORD_COST: u32 = 4; // bcrypt::MIN_COST (private in the bcrypt crate)

pub const MAX_PASSWORD_COST: u32 = 31; // bcrypt::MAX_COST (private in the bcrypt crate)

pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    let cost = cost.clamp(MIN_PASSWORD_COST, MAX_PASSWORD_COST);
    bcrypt::hash(password, cost)
        .map_err(|e| BookingError::Internal(anyhow!("password hashing failed: {e}")))
}

/// Returns false for malformed hashes; a bad row must never authenticate.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match bcrypt::verify(password, stored) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!("Stored password hash rejected: {e}");
            false
        }
    }
}
