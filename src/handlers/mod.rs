pub mod auth;
pub mod availability;
pub mod bookings;
pub mod events;
pub mod health;
pub mod setup;
pub mod static_files;
