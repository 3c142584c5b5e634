use crate::badges::{eligible_badges, BadgeType};
use crate::config::AccountsConfig;
use crate::crypto::CryptoService;
use crate::email::EmailSender;
use crate::errors::AccountsError;
use crate::models::{EmailVerification, User, UserBadge, UserProfile};
use crate::rate_limit::RateLimiter;
use crate::storage::Storage;
use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub struct AccountsService {
    pub config: AccountsConfig,
    storage: Arc<dyn Storage>,
    email_sender: Arc<dyn EmailSender>,
    crypto: CryptoService,
    rate_limiter: RateLimiter,
}

impl AccountsService {
    pub fn new(
        config: AccountsConfig,
        storage: Arc<dyn Storage>,
        email_sender: Arc<dyn EmailSender>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(storage.clone(), config.clone());
        Self {
            config,
            storage,
            email_sender,
            crypto: CryptoService,
            rate_limiter,
        }
    }

    /// Issues a fresh verification code for `email`, replacing any pending
    /// one, and delivers it by mail. The code is stored hashed.
    pub async fn request_code(&self, email: &str, ip: Option<&str>) -> Result<(), AccountsError> {
        let email = normalize_email(email)?;
        self.rate_limiter.guard_send_code(&email, ip).await?;

        if self.storage.get_user_by_email(&email).await?.is_some() {
            return Err(AccountsError::EmailTaken);
        }

        let code = self.crypto.generate_code(self.config.code_length);
        let now = Utc::now();
        let record = EmailVerification {
            email: email.clone(),
            code_hash: self.crypto.hash_secret(&code)?,
            expires_at: now + Duration::seconds(self.config.code_ttl_seconds as i64),
            attempts: 0,
            verified: false,
            created_at: now,
        };
        self.storage.put_verification(record).await?;

        self.email_sender
            .send_email(
                &email,
                "Your verification code",
                &format!(
                    "Your verification code is: {}\n\nIt expires in {} minutes.",
                    code,
                    self.config.code_ttl_seconds / 60
                ),
            )
            .await?;

        debug!(email = %email, "verification code issued");
        Ok(())
    }

    /// Checks a submitted code. Expiry is checked before the comparison, so a
    /// correct-but-late code still fails as expired. A wrong guess increments
    /// the attempt counter; the limit is enforced on the following call, so
    /// callers get exactly `max_verify_attempts` wrong guesses before the
    /// record is dropped.
    pub async fn verify_code(
        &self,
        email: &str,
        code: &str,
        ip: Option<&str>,
    ) -> Result<(), AccountsError> {
        let email = normalize_email(email)?;
        self.rate_limiter.guard_verify_code(&email, ip).await?;

        let record = self
            .storage
            .get_verification(&email)
            .await?
            .ok_or(AccountsError::CodeNotFound)?;

        if Utc::now() > record.expires_at {
            self.storage.delete_verification(&email).await?;
            return Err(AccountsError::CodeExpired);
        }

        if record.attempts >= self.config.max_verify_attempts as i32 {
            self.storage.delete_verification(&email).await?;
            return Err(AccountsError::TooManyAttempts);
        }

        if !self.crypto.verify_secret(code.trim(), &record.code_hash)? {
            self.storage.record_failed_attempt(&email).await?;
            return Err(AccountsError::InvalidCode);
        }

        self.storage.mark_verified(&email).await?;
        Ok(())
    }

    /// Completes registration for a verified address. Consumes the
    /// verification record (one-time use) and, when a referrer is cited,
    /// credits them and recomputes their badges.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        referred_by: Option<Uuid>,
    ) -> Result<UserProfile, AccountsError> {
        let email = normalize_email(email)?;
        if password.len() < 8 {
            return Err(AccountsError::ValidationError(
                "password must be at least 8 characters".to_string(),
            ));
        }

        let verified = self
            .storage
            .get_verification(&email)
            .await?
            .map(|record| record.verified)
            .unwrap_or(false);
        if !verified {
            return Err(AccountsError::VerificationRequired);
        }

        let user = self
            .storage
            .insert_user(User {
                id: Uuid::new_v4(),
                email: email.clone(),
                password_hash: self.crypto.hash_secret(password)?,
                referral_count: 0,
                mining_started_at: None,
                created_at: Utc::now(),
            })
            .await?;

        self.storage.delete_verification(&email).await?;
        info!(user = %user.id, "user registered");

        // Unknown referrer ids are ignored; the signup itself stands.
        if let Some(referrer_id) = referred_by {
            if let Some(referrer) = self.storage.increment_referral_count(referrer_id).await? {
                debug!(referrer = %referrer.id, count = referrer.referral_count, "referral credited");
                self.recompute_badges(referrer_id).await?;
            }
        }

        Ok(user.into())
    }

    /// Unknown address and wrong password are indistinguishable to callers.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        ip: Option<&str>,
    ) -> Result<UserProfile, AccountsError> {
        let email = normalize_email(email)?;
        self.rate_limiter.guard_sign_in(&email, ip).await?;

        let user = self
            .storage
            .get_user_by_email(&email)
            .await?
            .ok_or(AccountsError::InvalidCredentials)?;

        if !self.crypto.verify_secret(password, &user.password_hash)? {
            return Err(AccountsError::InvalidCredentials);
        }

        Ok(user.into())
    }

    /// Starts mining for the user. A repeat start never moves the timestamp,
    /// but recomputation still runs: that is the only route by which
    /// day-based badges get granted later, since recomputation is
    /// trigger-based and never scheduled.
    pub async fn start_mining(&self, user_id: Uuid) -> Result<UserProfile, AccountsError> {
        let user = self
            .storage
            .get_user(user_id)
            .await?
            .ok_or(AccountsError::UserNotFound)?;

        let user = if user.mining_started_at.is_some() {
            user
        } else {
            self.storage
                .set_mining_started_at(user_id, Some(Utc::now()))
                .await?
                .ok_or(AccountsError::UserNotFound)?
        };

        self.recompute_badges(user_id).await?;
        Ok(user.into())
    }

    /// Stops mining unconditionally. No recomputation: badges are a ratchet
    /// and already-awarded ones are retained.
    pub async fn stop_mining(&self, user_id: Uuid) -> Result<UserProfile, AccountsError> {
        let user = self
            .storage
            .set_mining_started_at(user_id, None)
            .await?
            .ok_or(AccountsError::UserNotFound)?;
        Ok(user.into())
    }

    /// Awards every newly-crossed threshold and returns the full badge list.
    /// An unknown user yields an empty list rather than an error. Safe to
    /// re-run at any time: eligibility is pure and awarding is idempotent
    /// both here and at the storage layer.
    pub async fn recompute_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>, AccountsError> {
        let Some(user) = self.storage.get_user(user_id).await? else {
            return Ok(Vec::new());
        };

        let held: HashSet<BadgeType> = self
            .storage
            .badges_for_user(user_id)
            .await?
            .iter()
            .map(|b| b.badge)
            .collect();

        let now = Utc::now();
        for badge in eligible_badges(user.referral_count, user.mining_started_at, now) {
            if !held.contains(&badge) {
                self.storage.award_badge(user_id, badge, now).await?;
                info!(user = %user_id, badge = badge.as_str(), "badge awarded");
            }
        }

        self.storage.badges_for_user(user_id).await
    }

    pub async fn badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>, AccountsError> {
        self.storage.badges_for_user(user_id).await
    }
}

fn normalize_email(raw: &str) -> Result<String, AccountsError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') || email.contains(char::is_whitespace) {
        return Err(AccountsError::ValidationError(
            "invalid email address".to_string(),
        ));
    }
    Ok(email)
}
