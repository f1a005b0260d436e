use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::model::DAILY_BOOKING_LIMIT;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing session or insufficient role. Rendered without detail.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("Slot already taken")]
    SlotTaken,

    #[error("Daily limit reached ({} slots max)", DAILY_BOOKING_LIMIT)]
    QuotaExceeded,

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BookingError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Unauthorized => 403,
            Self::InvalidCredentials => 401,
            Self::Forbidden(_) => 403,
            Self::InvalidInput(_) => 400,
            Self::SlotTaken => 409,
            Self::QuotaExceeded => 400,
            Self::Internal(_) => 500,
        }
    }
}

impl From<sqlx::Error> for BookingError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(anyhow::Error::new(e))
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = match &self {
            // Don't leak driver errors to clients
            Self::Internal(e) => {
                tracing::error!("Request failed: {e:#}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
