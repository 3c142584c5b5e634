use crate::errors::AccountsError;

/// Fixed-window rate limit rule for one endpoint: separate counters per
/// email address and per client IP, sharing a window length.
#[derive(Debug, Clone)]
pub struct RateLimitRule {
    pub per_email: u32,
    pub per_ip: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct AccountsConfig {
    /// Number of digits in a verification code.
    pub code_length: usize,
    /// How long a verification code stays valid after issuance.
    pub code_ttl_seconds: u64,
    /// Wrong guesses tolerated before the code is invalidated.
    pub max_verify_attempts: u32,
    pub send_code_limits: RateLimitRule,
    pub verify_code_limits: RateLimitRule,
    pub sign_in_limits: RateLimitRule,
    /// How often the cleanup job should run.
    pub cleanup_interval_seconds: u64,
    /// Rate-limit records older than this are swept regardless of their
    /// own window length.
    pub rate_limit_retention_seconds: u64,
    pub storage_type: StorageType,
    pub database_url: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_starttls: bool,
    pub smtp_username: String,
    pub smtp_password: String,
    pub mail_from: String,
    pub mail_from_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StorageType {
    Memory,
    Postgres,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            code_ttl_seconds: 600,
            max_verify_attempts: 3,
            send_code_limits: RateLimitRule {
                per_email: 3,
                per_ip: 10,
                window_seconds: 600,
            },
            verify_code_limits: RateLimitRule {
                per_email: 5,
                per_ip: 15,
                window_seconds: 600,
            },
            sign_in_limits: RateLimitRule {
                per_email: 5,
                per_ip: 20,
                window_seconds: 900,
            },
            cleanup_interval_seconds: 3600,
            rate_limit_retention_seconds: 3600,
            storage_type: StorageType::Memory,
            database_url: "postgres://localhost/minepool".to_string(),
            smtp_server: "localhost".to_string(),
            smtp_port: 1025,
            smtp_starttls: true,
            smtp_username: "".to_string(),
            smtp_password: "".to_string(),
            mail_from: "noreply@minepool.example".to_string(),
            mail_from_name: "Minepool".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, target: &mut T) -> Result<(), AccountsError> {
    if let Ok(val) = std::env::var(var) {
        *target = val
            .parse()
            .map_err(|_| AccountsError::ConfigError(format!("Invalid {}", var)))?;
    }
    Ok(())
}

impl AccountsConfig {
    pub fn from_env() -> Result<Self, AccountsError> {
        let mut config = Self::default();

        env_parse("CODE_LENGTH", &mut config.code_length)?;
        env_parse("CODE_TTL_SECONDS", &mut config.code_ttl_seconds)?;
        env_parse("MAX_VERIFY_ATTEMPTS", &mut config.max_verify_attempts)?;

        env_parse(
            "SEND_CODE_LIMIT_PER_EMAIL",
            &mut config.send_code_limits.per_email,
        )?;
        env_parse("SEND_CODE_LIMIT_PER_IP", &mut config.send_code_limits.per_ip)?;
        env_parse(
            "SEND_CODE_WINDOW_SECONDS",
            &mut config.send_code_limits.window_seconds,
        )?;

        env_parse(
            "VERIFY_CODE_LIMIT_PER_EMAIL",
            &mut config.verify_code_limits.per_email,
        )?;
        env_parse(
            "VERIFY_CODE_LIMIT_PER_IP",
            &mut config.verify_code_limits.per_ip,
        )?;
        env_parse(
            "VERIFY_CODE_WINDOW_SECONDS",
            &mut config.verify_code_limits.window_seconds,
        )?;

        env_parse(
            "SIGN_IN_LIMIT_PER_EMAIL",
            &mut config.sign_in_limits.per_email,
        )?;
        env_parse("SIGN_IN_LIMIT_PER_IP", &mut config.sign_in_limits.per_ip)?;
        env_parse(
            "SIGN_IN_WINDOW_SECONDS",
            &mut config.sign_in_limits.window_seconds,
        )?;

        env_parse(
            "CLEANUP_INTERVAL_SECONDS",
            &mut config.cleanup_interval_seconds,
        )?;
        env_parse(
            "RATE_LIMIT_RETENTION_SECONDS",
            &mut config.rate_limit_retention_seconds,
        )?;

        if let Ok(val) = std::env::var("STORAGE_TYPE") {
            config.storage_type = match val.to_lowercase().as_str() {
                "memory" => StorageType::Memory,
                "postgres" => StorageType::Postgres,
                _ => {
                    return Err(AccountsError::ConfigError(
                        "Invalid STORAGE_TYPE: must be 'memory' or 'postgres'".to_string(),
                    ))
                }
            };
        }

        if let Ok(val) = std::env::var("DATABASE_URL") {
            config.database_url = val;
        } else if config.storage_type == StorageType::Postgres {
            return Err(AccountsError::ConfigError(
                "DATABASE_URL must be set when STORAGE_TYPE is 'postgres'".to_string(),
            ));
        }

        if let Ok(val) = std::env::var("SMTP_HOST") {
            config.smtp_server = val;
        }
        env_parse("SMTP_PORT", &mut config.smtp_port)?;
        if let Ok(val) = std::env::var("SMTP_STARTTLS") {
            config.smtp_starttls = val.parse().unwrap_or(true);
        }
        if let Ok(val) = std::env::var("SMTP_USERNAME") {
            config.smtp_username = val;
        }
        if let Ok(val) = std::env::var("SMTP_PASSWORD") {
            config.smtp_password = val;
        }
        if let Ok(val) = std::env::var("SMTP_MAIL_FROM") {
            config.mail_from = val;
        }
        if let Ok(val) = std::env::var("SMTP_MAIL_FROM_NAME") {
            config.mail_from_name = val;
        }

        Ok(config)
    }
}
