//! Configuration management.
//!
//! This module handles:
//! - Environment variable loading
//! - Configuration validation
//! - Default value handling
//! - Secure API key storage via [`SecretString`]
//!
//! # Example
//!
//! ```
//! use report_tuner::config::{Config, SecretString, DEFAULT_BASE_MODEL};
//!
//! // Create a config directly (use Config::from_env() in production)
//! let config = Config {
//!     provider_api_key: SecretString::new("sk-example-key"),
//!     provider_base_url: "https://api.openai.com/v1".to_string(),
//!     database_path: "./data/report-tuner.db".to_string(),
//!     archive_dir: "./data/training-sets".to_string(),
//!     log_level: "info".to_string(),
//!     base_model: DEFAULT_BASE_MODEL.to_string(),
//!     min_rating: 6,
//!     batch_size: 10,
//!     request_timeout_ms: 30_000,
//!     max_retries: 3,
//!     retry_delay_ms: 1_000,
//!     trigger_interval_secs: 60,
//!     reconcile_interval_secs: 600,
//! };
//!
//! // API key is protected from accidental logging
//! let debug = format!("{:?}", config);
//! assert!(debug.contains("<REDACTED>"));
//! assert!(!debug.contains("sk-example-key"));
//! ```

mod secret;
mod validation;

pub use secret::SecretString;
pub use validation::{validate_config, MAX_BATCH_SIZE, MAX_RETRIES, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS};

use crate::error::ConfigError;

/// Default provider base URL.
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.openai.com/v1";

/// Default database path.
pub const DEFAULT_DATABASE_PATH: &str = "./data/report-tuner.db";

/// Default archive directory for training-set blobs.
pub const DEFAULT_ARCHIVE_DIR: &str = "./data/training-sets";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default base model used when the registry has no entry.
pub const DEFAULT_BASE_MODEL: &str = "gpt-3.5-turbo";

/// Default minimum rating for feedback to qualify for retraining.
pub const DEFAULT_MIN_RATING: i64 = 6;

/// Default number of qualifying records that triggers a cycle.
pub const DEFAULT_BATCH_SIZE: i64 = 10;

/// Default request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default maximum retry attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default initial retry delay in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Default interval between threshold evaluations, in seconds.
pub const DEFAULT_TRIGGER_INTERVAL_SECS: u64 = 60;

/// Default interval between reconciliation polls, in seconds.
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 600;

/// Application configuration.
///
/// Use [`Config::from_env`] to load configuration from environment
/// variables. The `provider_api_key` field uses [`SecretString`] to
/// prevent accidental logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Provider API key (protected from logging via [`SecretString`]).
    pub provider_api_key: SecretString,
    /// Provider API base URL.
    pub provider_base_url: String,
    /// Database path.
    pub database_path: String,
    /// Archive directory for training-set blobs.
    pub archive_dir: String,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: String,
    /// Default base model for generation and fine-tuning.
    pub base_model: String,
    /// Minimum rating for feedback to qualify (1-7).
    pub min_rating: i64,
    /// Number of qualifying records that triggers a retraining cycle.
    pub batch_size: i64,
    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum retry attempts for archival and provider calls.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub retry_delay_ms: u64,
    /// Interval between threshold evaluations, in seconds.
    pub trigger_interval_secs: u64,
    /// Interval between reconciliation polls, in seconds.
    pub reconcile_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `PROVIDER_API_KEY`: fine-tuning provider API key
    ///
    /// Optional environment variables (with defaults):
    /// - `PROVIDER_BASE_URL`: provider API base URL (default: `https://api.openai.com/v1`)
    /// - `DATABASE_PATH`: path to `SQLite` database (default: `./data/report-tuner.db`)
    /// - `ARCHIVE_DIR`: training-set archive directory (default: `./data/training-sets`)
    /// - `LOG_LEVEL`: logging level (default: `info`)
    /// - `BASE_MODEL`: default base model (default: `gpt-3.5-turbo`)
    /// - `MIN_RATING`: minimum qualifying rating (default: `6`)
    /// - `RETRAIN_BATCH_SIZE`: cycle trigger threshold (default: `10`)
    /// - `REQUEST_TIMEOUT_MS`: request timeout (default: `30000`)
    /// - `MAX_RETRIES`: maximum retry attempts (default: `3`)
    /// - `RETRY_DELAY_MS`: initial retry delay (default: `1000`)
    /// - `TRIGGER_INTERVAL_SECS`: threshold evaluation interval (default: `60`)
    /// - `RECONCILE_INTERVAL_SECS`: reconciliation poll interval (default: `600`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `PROVIDER_API_KEY` is missing, a numeric
    /// variable fails to parse, or any value fails validation (see
    /// [`validate_config`]).
    #[must_use = "configuration should be used"]
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let provider_api_key =
            std::env::var("PROVIDER_API_KEY").map_err(|_| ConfigError::MissingRequired {
                var: "PROVIDER_API_KEY".into(),
            })?;

        let provider_base_url = std::env::var("PROVIDER_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_PROVIDER_BASE_URL.into());
        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DATABASE_PATH.into());
        let archive_dir =
            std::env::var("ARCHIVE_DIR").unwrap_or_else(|_| DEFAULT_ARCHIVE_DIR.into());
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into());
        let base_model = std::env::var("BASE_MODEL").unwrap_or_else(|_| DEFAULT_BASE_MODEL.into());

        let min_rating = parse_env_i64("MIN_RATING", DEFAULT_MIN_RATING)?;
        let batch_size = parse_env_i64("RETRAIN_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        let request_timeout_ms = parse_env_u64("REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;
        let max_retries = parse_env_u32("MAX_RETRIES", DEFAULT_MAX_RETRIES)?;
        let retry_delay_ms = parse_env_u64("RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)?;
        let trigger_interval_secs =
            parse_env_u64("TRIGGER_INTERVAL_SECS", DEFAULT_TRIGGER_INTERVAL_SECS)?;
        let reconcile_interval_secs =
            parse_env_u64("RECONCILE_INTERVAL_SECS", DEFAULT_RECONCILE_INTERVAL_SECS)?;

        let config = Self {
            provider_api_key: SecretString::new(provider_api_key),
            provider_base_url,
            database_path,
            archive_dir,
            log_level,
            base_model,
            min_rating,
            batch_size,
            request_timeout_ms,
            max_retries,
            retry_delay_ms,
            trigger_interval_secs,
            reconcile_interval_secs,
        };

        validate_config(&config)?;
        Ok(config)
    }
}

/// Parse an environment variable as i64, using a default if not set.
fn parse_env_i64(name: &str, default: i64) -> Result<i64, ConfigError> {
    std::env::var(name).map_or(Ok(default), |val| {
        val.parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be an integer".into(),
        })
    })
}

/// Parse an environment variable as u64, using a default if not set.
fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    std::env::var(name).map_or(Ok(default), |val| {
        val.parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be a positive integer".into(),
        })
    })
}

/// Parse an environment variable as u32, using a default if not set.
fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    std::env::var(name).map_or(Ok(default), |val| {
        val.parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be a positive integer".into(),
        })
    })
}
