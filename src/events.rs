//! Best-effort fan-out of booking updates to connected viewers.
//!
//! One bounded broadcast channel for the whole server. Publishing never
//! blocks and never fails the booking: with no subscribers the event is
//! dropped, and a subscriber that falls more than `capacity` events behind
//! skips the ones it missed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{Booking, DATE_FORMAT};

pub const MAP_UPDATE_EVENT: &str = "map_update";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapUpdate {
    pub location_id: String,
    pub slot_id: i32,
    pub date: String,
    pub status: String,
    pub club_name: String,
    pub event_name: String,
}

impl MapUpdate {
    pub fn booked(booking: &Booking, club_name: &str) -> Self {
        Self {
            location_id: booking.location_id.clone(),
            slot_id: booking.slot_id,
            date: format_date(booking.date),
            status: "booked".to_string(),
            club_name: club_name.to_string(),
            event_name: booking.event_name.clone(),
        }
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[derive(Clone)]
pub struct BookingEvents {
    tx: broadcast::Sender<MapUpdate>,
}

impl BookingEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many viewers the update was queued for.
    pub fn publish(&self, update: MapUpdate) -> usize {
        match self.tx.send(update) {
            Ok(n) => {
                tracing::debug!("map_update delivered to {n} viewer(s)");
                n
            }
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MapUpdate> {
        self.tx.subscribe()
    }

    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BookingEvents {
    fn default() -> Self {
        Self::new(64)
    }
}
