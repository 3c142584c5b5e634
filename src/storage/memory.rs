use crate::badges::BadgeType;
use crate::errors::AccountsError;
use crate::models::{EmailVerification, User, UserBadge};
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Clone)]
struct RateLimitEntry {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Process-local backend for single-instance deployments and tests.
pub struct InMemoryStorage {
    verifications: Arc<RwLock<HashMap<String, EmailVerification>>>,
    rate_limits: Arc<RwLock<HashMap<String, RateLimitEntry>>>,
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    badges: Arc<RwLock<HashMap<Uuid, Vec<UserBadge>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            verifications: Arc::new(RwLock::new(HashMap::new())),
            rate_limits: Arc::new(RwLock::new(HashMap::new())),
            users: Arc::new(RwLock::new(HashMap::new())),
            badges: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> AccountsError {
    AccountsError::StorageError("Lock poisoned".into())
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn put_verification(&self, record: EmailVerification) -> Result<(), AccountsError> {
        let mut map = self.verifications.write().map_err(|_| poisoned())?;
        map.insert(record.email.clone(), record);
        Ok(())
    }

    async fn get_verification(
        &self,
        email: &str,
    ) -> Result<Option<EmailVerification>, AccountsError> {
        let map = self.verifications.read().map_err(|_| poisoned())?;
        Ok(map.get(email).cloned())
    }

    async fn record_failed_attempt(&self, email: &str) -> Result<u32, AccountsError> {
        let mut map = self.verifications.write().map_err(|_| poisoned())?;
        match map.get_mut(email) {
            Some(record) => {
                record.attempts += 1;
                Ok(record.attempts as u32)
            }
            None => Ok(0),
        }
    }

    async fn mark_verified(&self, email: &str) -> Result<(), AccountsError> {
        let mut map = self.verifications.write().map_err(|_| poisoned())?;
        if let Some(record) = map.get_mut(email) {
            record.verified = true;
        }
        Ok(())
    }

    async fn delete_verification(&self, email: &str) -> Result<(), AccountsError> {
        let mut map = self.verifications.write().map_err(|_| poisoned())?;
        map.remove(email);
        Ok(())
    }

    async fn purge_expired_verifications(&self, now: DateTime<Utc>) -> Result<u64, AccountsError> {
        let mut map = self.verifications.write().map_err(|_| poisoned())?;
        let before = map.len();
        map.retain(|_, record| record.expires_at >= now);
        Ok((before - map.len()) as u64)
    }

    async fn check_rate_limit(
        &self,
        key: &str,
        max_attempts: u32,
        window_seconds: u64,
    ) -> Result<bool, AccountsError> {
        // Single write-lock acquisition: concurrent hits for the same key
        // cannot both observe the last free slot.
        let mut map = self.rate_limits.write().map_err(|_| poisoned())?;
        let now = Utc::now();

        let entry = map.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        if now - entry.window_start > Duration::seconds(window_seconds as i64) {
            entry.count = 1;
            entry.window_start = now;
        } else if entry.count >= max_attempts {
            return Ok(true);
        } else {
            entry.count += 1;
        }

        Ok(false)
    }

    async fn purge_rate_limits(&self, cutoff: DateTime<Utc>) -> Result<u64, AccountsError> {
        let mut map = self.rate_limits.write().map_err(|_| poisoned())?;
        let before = map.len();
        map.retain(|_, entry| entry.window_start >= cutoff);
        Ok((before - map.len()) as u64)
    }

    async fn insert_user(&self, user: User) -> Result<User, AccountsError> {
        let mut map = self.users.write().map_err(|_| poisoned())?;
        if map.values().any(|u| u.email == user.email) {
            return Err(AccountsError::EmailTaken);
        }
        map.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AccountsError> {
        let map = self.users.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AccountsError> {
        let map = self.users.read().map_err(|_| poisoned())?;
        Ok(map.values().find(|u| u.email == email).cloned())
    }

    async fn increment_referral_count(&self, id: Uuid) -> Result<Option<User>, AccountsError> {
        let mut map = self.users.write().map_err(|_| poisoned())?;
        Ok(map.get_mut(&id).map(|user| {
            user.referral_count += 1;
            user.clone()
        }))
    }

    async fn set_mining_started_at(
        &self,
        id: Uuid,
        at: Option<DateTime<Utc>>,
    ) -> Result<Option<User>, AccountsError> {
        let mut map = self.users.write().map_err(|_| poisoned())?;
        Ok(map.get_mut(&id).map(|user| {
            user.mining_started_at = at;
            user.clone()
        }))
    }

    async fn award_badge(
        &self,
        user_id: Uuid,
        badge: BadgeType,
        awarded_at: DateTime<Utc>,
    ) -> Result<(), AccountsError> {
        let mut map = self.badges.write().map_err(|_| poisoned())?;
        let held = map.entry(user_id).or_default();
        if !held.iter().any(|b| b.badge == badge) {
            held.push(UserBadge {
                user_id,
                badge,
                awarded_at,
            });
        }
        Ok(())
    }

    async fn badges_for_user(&self, user_id: Uuid) -> Result<Vec<UserBadge>, AccountsError> {
        let map = self.badges.read().map_err(|_| poisoned())?;
        Ok(map.get(&user_id).cloned().unwrap_or_default())
    }
}
