//! Shared application state
//!
//! Cloned into every handler. The service owns the store and the event hub;
//! session keys are also installed as an extension for the auth middleware.

use crate::middleware::session::SessionKeys;
use crate::service::{BookingService, SetupSeed};
use crate::shutdown::Shutdown;

#[derive(Clone)]
pub struct AppState {
    pub service: BookingService,
    pub sessions: SessionKeys,
    pub seed: SetupSeed,
    /// Fired by the server on SIGINT/SIGTERM; ends open event streams.
    pub shutdown: Shutdown,
}

impl AppState {
    pub fn new(service: BookingService, sessions: SessionKeys, seed: SetupSeed) -> Self {
        Self {
            service,
            sessions,
            seed,
            shutdown: Shutdown::new(),
        }
    }
}
