use crate::badges::BadgeType;
use crate::errors::AccountsError;
use crate::models::{EmailVerification, User, UserBadge};
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, referral_count, mining_started_at, created_at";

/// Relational backend. Schema lives in `migrations/`; the `(user_id, badge)`
/// primary key on `user_badges` is the safety net against concurrent
/// double-awards, and `users.email` carries a unique constraint.
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, AccountsError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn put_verification(&self, record: EmailVerification) -> Result<(), AccountsError> {
        sqlx::query(
            r#"
            INSERT INTO email_verifications (email, code_hash, expires_at, attempts, verified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE SET
                code_hash = EXCLUDED.code_hash,
                expires_at = EXCLUDED.expires_at,
                attempts = EXCLUDED.attempts,
                verified = EXCLUDED.verified,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&record.email)
        .bind(&record.code_hash)
        .bind(record.expires_at)
        .bind(record.attempts)
        .bind(record.verified)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_verification(
        &self,
        email: &str,
    ) -> Result<Option<EmailVerification>, AccountsError> {
        let record = sqlx::query_as::<_, EmailVerification>(
            "SELECT email, code_hash, expires_at, attempts, verified, created_at \
             FROM email_verifications WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn record_failed_attempt(&self, email: &str) -> Result<u32, AccountsError> {
        let row = sqlx::query(
            "UPDATE email_verifications SET attempts = attempts + 1 WHERE email = $1 RETURNING attempts",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => {
                let attempts: i32 = row.try_get("attempts")?;
                Ok(attempts as u32)
            }
            None => Ok(0),
        }
    }

    async fn mark_verified(&self, email: &str) -> Result<(), AccountsError> {
        sqlx::query("UPDATE email_verifications SET verified = TRUE WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_verification(&self, email: &str) -> Result<(), AccountsError> {
        sqlx::query("DELETE FROM email_verifications WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired_verifications(&self, now: DateTime<Utc>) -> Result<u64, AccountsError> {
        let result = sqlx::query("DELETE FROM email_verifications WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn check_rate_limit(
        &self,
        key: &str,
        max_attempts: u32,
        window_seconds: u64,
    ) -> Result<bool, AccountsError> {
        // Row lock for the duration of the decision; see the trait contract.
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT count, window_start FROM rate_limits WHERE key = $1 FOR UPDATE")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;
        let now = Utc::now();

        let limited = match row {
            Some(row) => {
                let count: i32 = row.try_get("count")?;
                let window_start: DateTime<Utc> = row.try_get("window_start")?;
                if now - window_start > Duration::seconds(window_seconds as i64) {
                    sqlx::query("UPDATE rate_limits SET count = 1, window_start = $2 WHERE key = $1")
                        .bind(key)
                        .bind(now)
                        .execute(&mut *tx)
                        .await?;
                    false
                } else if count >= max_attempts as i32 {
                    true
                } else {
                    sqlx::query("UPDATE rate_limits SET count = count + 1 WHERE key = $1")
                        .bind(key)
                        .execute(&mut *tx)
                        .await?;
                    false
                }
            }
            None => {
                sqlx::query(
                    "INSERT INTO rate_limits (key, count, window_start) VALUES ($1, 1, $2) \
                     ON CONFLICT (key) DO UPDATE SET count = 1, window_start = EXCLUDED.window_start",
                )
                .bind(key)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                false
            }
        };
        tx.commit().await?;
        Ok(limited)
    }

    async fn purge_rate_limits(&self, cutoff: DateTime<Utc>) -> Result<u64, AccountsError> {
        let result = sqlx::query("DELETE FROM rate_limits WHERE window_start < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_user(&self, user: User) -> Result<User, AccountsError> {
        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.referral_count)
        .bind(user.mining_started_at)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some("users_email_key") =>
            {
                Err(AccountsError::EmailTaken)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AccountsError> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AccountsError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn increment_referral_count(&self, id: Uuid) -> Result<Option<User>, AccountsError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET referral_count = referral_count + 1 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_mining_started_at(
        &self,
        id: Uuid,
        at: Option<DateTime<Utc>>,
    ) -> Result<Option<User>, AccountsError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET mining_started_at = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn award_badge(
        &self,
        user_id: Uuid,
        badge: BadgeType,
        awarded_at: DateTime<Utc>,
    ) -> Result<(), AccountsError> {
        sqlx::query(
            "INSERT INTO user_badges (user_id, badge, awarded_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, badge) DO NOTHING",
        )
        .bind(user_id)
        .bind(badge.as_str())
        .bind(awarded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn badges_for_user(&self, user_id: Uuid) -> Result<Vec<UserBadge>, AccountsError> {
        let rows = sqlx::query(
            "SELECT user_id, badge, awarded_at FROM user_badges WHERE user_id = $1 ORDER BY awarded_at, badge",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let name: String = row.try_get("badge")?;
                let badge = BadgeType::parse(&name).ok_or_else(|| {
                    AccountsError::StorageError(format!("unknown badge type in store: {name}"))
                })?;
                Ok(UserBadge {
                    user_id: row.try_get("user_id")?,
                    badge,
                    awarded_at: row.try_get("awarded_at")?,
                })
            })
            .collect()
    }
}
