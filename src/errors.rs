use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountsError {
    #[error("Too many requests, wait before retrying")]
    RateLimited,

    #[error("No verification code requested for this address")]
    CodeNotFound,

    #[error("Verification code expired, request a new one")]
    CodeExpired,

    #[error("Too many failed attempts, request a new code")]
    TooManyAttempts,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Email verification required")]
    VerificationRequired,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Email error: {0}")]
    EmailError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Hashing error: {0}")]
    HashError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AccountsError {
    /// Stable machine-readable discriminant, used by the transport layer so
    /// clients never have to parse human-facing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AccountsError::RateLimited => "rate_limited",
            AccountsError::CodeNotFound => "code_not_found",
            AccountsError::CodeExpired => "code_expired",
            AccountsError::TooManyAttempts => "too_many_attempts",
            AccountsError::InvalidCode => "invalid_code",
            AccountsError::VerificationRequired => "verification_required",
            AccountsError::EmailTaken => "email_taken",
            AccountsError::InvalidCredentials => "invalid_credentials",
            AccountsError::UserNotFound => "user_not_found",
            AccountsError::ValidationError(_) => "validation_error",
            AccountsError::EmailError(_) => "email_error",
            AccountsError::DatabaseError(_) => "database_error",
            AccountsError::StorageError(_) => "storage_error",
            AccountsError::HashError(_) => "hash_error",
            AccountsError::ConfigError(_) => "config_error",
        }
    }
}
