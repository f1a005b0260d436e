//! Session tokens and the request gate for protected routes.
//!
//! Login issues an HS256 JWT carrying the user's id, role, and home club.
//! Clients present it either as `Authorization: Bearer <token>` or in the
//! `session` cookie set by `/api/login`. The middleware verifies it and
//! inserts a [`Principal`] extension; anything else is rejected with 403.

use std::time::Duration;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::error::{BookingError, Result};
use crate::model::User;
use crate::principal::{Principal, SessionClaims};

pub const SESSION_COOKIE: &str = "session";

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn from_secret(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = SessionClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            club_id: user.club_id,
            iat: now,
            exp: now + self.ttl.as_secs(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| BookingError::Internal(anyhow::anyhow!("token encoding failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Principal> {
        let data = decode::<SessionClaims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                tracing::debug!("Session token rejected: {e}");
                BookingError::Unauthorized
            })?;
        Principal::from_claims(&data.claims)
    }
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.as_secs()
    )
}

/// `Set-Cookie` value that expires the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Bearer header wins over the cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value)
}

/// Middleware for protected routes. Requires `Extension<SessionKeys>`.
pub async fn session_auth(
    Extension(keys): Extension<SessionKeys>,
    mut req: Request,
    next: Next,
) -> Response {
    let principal = match token_from_headers(req.headers()) {
        Some(token) => keys.verify(token),
        None => Err(BookingError::Unauthorized),
    };

    match principal {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}
