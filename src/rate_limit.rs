use crate::config::{AccountsConfig, RateLimitRule};
use crate::errors::AccountsError;
use crate::storage::Storage;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Fixed-window throttling for the sensitive endpoints. Each guard checks an
/// email-keyed window and, when a client IP is known, an IP-keyed one.
///
/// Fixed window, not sliding: a burst of `max` requests at the very end of a
/// window followed by another burst right after the reset is accepted, so the
/// worst case is twice the nominal rate across a window boundary.
pub struct RateLimiter {
    storage: Arc<dyn Storage>,
    config: AccountsConfig,
}

impl RateLimiter {
    pub fn new(storage: Arc<dyn Storage>, config: AccountsConfig) -> Self {
        Self { storage, config }
    }

    pub async fn is_rate_limited(
        &self,
        key: &str,
        max_attempts: u32,
        window_seconds: u64,
    ) -> Result<bool, AccountsError> {
        self.storage
            .check_rate_limit(key, max_attempts, window_seconds)
            .await
    }

    pub async fn guard_send_code(
        &self,
        email: &str,
        ip: Option<&str>,
    ) -> Result<(), AccountsError> {
        let rule = self.config.send_code_limits.clone();
        self.guard("send-code", email, ip, &rule).await
    }

    pub async fn guard_verify_code(
        &self,
        email: &str,
        ip: Option<&str>,
    ) -> Result<(), AccountsError> {
        let rule = self.config.verify_code_limits.clone();
        self.guard("verify-code", email, ip, &rule).await
    }

    pub async fn guard_sign_in(&self, email: &str, ip: Option<&str>) -> Result<(), AccountsError> {
        let rule = self.config.sign_in_limits.clone();
        self.guard("sign-in", email, ip, &rule).await
    }

    async fn guard(
        &self,
        scope: &str,
        email: &str,
        ip: Option<&str>,
        rule: &RateLimitRule,
    ) -> Result<(), AccountsError> {
        let email_key = format!("{scope}:email:{email}");
        if self
            .is_rate_limited(&email_key, rule.per_email, rule.window_seconds)
            .await?
        {
            return Err(AccountsError::RateLimited);
        }

        if let Some(ip) = ip {
            let ip_key = format!("{scope}:ip:{ip}");
            if self
                .is_rate_limited(&ip_key, rule.per_ip, rule.window_seconds)
                .await?
            {
                return Err(AccountsError::RateLimited);
            }
        }

        Ok(())
    }

    /// Sweeps counters whose window started before the retention horizon.
    /// Invoked by the cleanup scheduler; never self-scheduled.
    pub async fn cleanup(&self) -> Result<u64, AccountsError> {
        let cutoff =
            Utc::now() - Duration::seconds(self.config.rate_limit_retention_seconds as i64);
        self.storage.purge_rate_limits(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    fn limiter_with(config: AccountsConfig) -> RateLimiter {
        RateLimiter::new(Arc::new(InMemoryStorage::new()), config)
    }

    #[tokio::test]
    async fn guard_trips_after_the_email_budget() {
        let limiter = limiter_with(AccountsConfig::default());

        for _ in 0..3 {
            limiter.guard_send_code("a@example.com", None).await.unwrap();
        }
        assert!(matches!(
            limiter.guard_send_code("a@example.com", None).await,
            Err(AccountsError::RateLimited)
        ));

        // another address is unaffected
        limiter.guard_send_code("b@example.com", None).await.unwrap();
    }

    #[tokio::test]
    async fn ip_budget_spans_addresses() {
        let limiter = limiter_with(AccountsConfig::default());
        let ip = Some("198.51.100.7");

        for i in 0..10 {
            limiter
                .guard_send_code(&format!("m{i}@example.com"), ip)
                .await
                .unwrap();
        }
        assert!(matches!(
            limiter.guard_send_code("m10@example.com", ip).await,
            Err(AccountsError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn scopes_do_not_share_counters() {
        let limiter = limiter_with(AccountsConfig::default());

        for _ in 0..3 {
            limiter.guard_send_code("a@example.com", None).await.unwrap();
        }
        // send-code is exhausted; sign-in for the same address is not
        limiter.guard_sign_in("a@example.com", None).await.unwrap();
    }

    #[tokio::test]
    async fn cleanup_sweeps_everything_past_the_horizon() {
        let mut config = AccountsConfig::default();
        config.rate_limit_retention_seconds = 0;
        let limiter = limiter_with(config);

        limiter.guard_send_code("a@example.com", None).await.unwrap();
        limiter
            .guard_sign_in("a@example.com", Some("198.51.100.7"))
            .await
            .unwrap();

        // three keys: send-code email, sign-in email, sign-in ip
        assert_eq!(limiter.cleanup().await.unwrap(), 3);
    }
}
