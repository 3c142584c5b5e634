#![doc = include_str!("../README.md")]

#[cfg(feature = "axum")]
pub mod axum_api;
pub mod badges;
pub mod config;
pub mod cron;
pub mod crypto;
pub mod email;
pub mod errors;
pub mod models;
pub mod rate_limit;
pub mod service;
pub mod storage;

pub use badges::BadgeType;
pub use config::{AccountsConfig, RateLimitRule, StorageType};
pub use cron::CleanupService;
pub use email::{EmailSender, LettreEmailSender};
pub use errors::AccountsError;
pub use models::{EmailVerification, User, UserBadge, UserProfile};
pub use rate_limit::RateLimiter;
pub use service::AccountsService;
pub use storage::{InMemoryStorage, PostgresStorage, Storage};
