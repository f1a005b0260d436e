use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};
use crate::model::{Role, User};

/// The authenticated caller, built from a verified session token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub club_id: Option<i64>,
}

impl Principal {
    /// Construct from validated session claims at the HTTP boundary.
    pub fn from_claims(claims: &SessionClaims) -> Result<Self> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| BookingError::Unauthorized)?;
        let role = Role::parse(&claims.role).ok_or(BookingError::Unauthorized)?;
        Ok(Self {
            user_id,
            username: claims.username.clone(),
            role,
            club_id: claims.club_id,
        })
    }

    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            club_id: user.club_id,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn require_any_role(&self, roles: &[Role]) -> Result<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            tracing::debug!(
                user = %self.username,
                role = %self.role,
                "Rejected: role not permitted"
            );
            Err(BookingError::Unauthorized)
        }
    }

    /// Resolve which club a booking is made for.
    ///
    /// Club admins are pinned to their home club. Super admins may name any
    /// club and fall back to their own when they have one.
    pub fn booking_club(&self, requested: Option<i64>) -> Result<i64> {
        match self.role {
            Role::ClubAdmin => {
                let home = self.club_id.ok_or_else(|| {
                    BookingError::Forbidden(format!("{} has no home club", self.username))
                })?;
                match requested {
                    Some(other) if other != home => Err(BookingError::Forbidden(
                        "club admins may only book for their own club".into(),
                    )),
                    _ => Ok(home),
                }
            }
            Role::SuperAdmin => requested.or(self.club_id).ok_or_else(|| {
                BookingError::InvalidInput("club_id is required for super admin bookings".into())
            }),
            Role::User => Err(BookingError::Unauthorized),
        }
    }
}

/// Session token claims. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub username: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club_id: Option<i64>,
    pub iat: u64,
    pub exp: u64,
}
