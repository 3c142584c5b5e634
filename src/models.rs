use crate::badges::BadgeType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Full user record as persisted. Never serialized directly; API responses go
/// through [`UserProfile`] so the password hash cannot leak.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub referral_count: i32,
    pub mining_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Public projection of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub referral_count: i32,
    pub mining_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            referral_count: user.referral_count,
            mining_started_at: user.mining_started_at,
            created_at: user.created_at,
        }
    }
}

/// Pending email verification. At most one record per (lower-cased) address;
/// a re-request replaces the record wholesale.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailVerification {
    pub email: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// An awarded achievement badge. Append-only; unique per `(user_id, badge)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBadge {
    pub user_id: Uuid,
    pub badge: BadgeType,
    pub awarded_at: DateTime<Utc>,
}
