use crate::badges::BadgeType;
use crate::errors::AccountsError;
use crate::models::{EmailVerification, User, UserBadge};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stores a verification record, replacing any existing one for the same
    /// email. Re-requesting a code always invalidates the previous one.
    async fn put_verification(&self, record: EmailVerification) -> Result<(), AccountsError>;
    /// Returns the record as stored, expired or not; the caller decides what
    /// expiry means so it can report it distinctly from "never requested".
    async fn get_verification(&self, email: &str)
        -> Result<Option<EmailVerification>, AccountsError>;
    /// Increments the failed-attempt counter, returning the new value.
    /// Returns 0 if no record exists.
    async fn record_failed_attempt(&self, email: &str) -> Result<u32, AccountsError>;
    async fn mark_verified(&self, email: &str) -> Result<(), AccountsError>;
    async fn delete_verification(&self, email: &str) -> Result<(), AccountsError>;
    /// Deletes records whose `expires_at` is before `now`; returns how many.
    async fn purge_expired_verifications(&self, now: DateTime<Utc>) -> Result<u64, AccountsError>;

    /// Fixed-window counter check. Returns `true` when the key is limited.
    /// The whole decision runs atomically per backend so two concurrent
    /// callers cannot both take the last slot:
    /// - no record, or window elapsed: reset to `{count: 1}`, not limited
    /// - `count >= max_attempts`: limited, record untouched
    /// - otherwise: increment, not limited
    async fn check_rate_limit(
        &self,
        key: &str,
        max_attempts: u32,
        window_seconds: u64,
    ) -> Result<bool, AccountsError>;
    /// Deletes counters whose window started before `cutoff`; returns how many.
    async fn purge_rate_limits(&self, cutoff: DateTime<Utc>) -> Result<u64, AccountsError>;

    /// Fails with [`AccountsError::EmailTaken`] on a duplicate address.
    async fn insert_user(&self, user: User) -> Result<User, AccountsError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AccountsError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AccountsError>;
    /// Returns the updated user, or `None` if the id is unknown.
    async fn increment_referral_count(&self, id: Uuid) -> Result<Option<User>, AccountsError>;
    async fn set_mining_started_at(
        &self,
        id: Uuid,
        at: Option<DateTime<Utc>>,
    ) -> Result<Option<User>, AccountsError>;

    /// Insert-or-ignore under the `(user_id, badge)` uniqueness guarantee.
    /// Awarding an already-held badge is a no-op, never a duplicate.
    async fn award_badge(
        &self,
        user_id: Uuid,
        badge: BadgeType,
        awarded_at: DateTime<Utc>,
    ) -> Result<(), AccountsError>;
    async fn badges_for_user(&self, user_id: Uuid) -> Result<Vec<UserBadge>, AccountsError>;
}

pub use self::memory::InMemoryStorage;
pub use self::postgres::PostgresStorage;
