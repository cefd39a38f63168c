//! Configuration validation.

use crate::error::ConfigError;

use super::Config;

/// Minimum allowed request timeout in milliseconds.
pub const MIN_TIMEOUT_MS: u64 = 1_000;
/// Maximum allowed request timeout in milliseconds.
pub const MAX_TIMEOUT_MS: u64 = 600_000;
/// Maximum allowed retry attempts.
pub const MAX_RETRIES: u32 = 10;
/// Maximum allowed retraining batch size.
pub const MAX_BATCH_SIZE: i64 = 10_000;

/// Validate a loaded configuration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for any field outside its
/// accepted range.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.provider_api_key.is_empty() {
        return Err(ConfigError::InvalidValue {
            var: "PROVIDER_API_KEY".into(),
            reason: "must not be empty".into(),
        });
    }

    if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&config.request_timeout_ms) {
        return Err(ConfigError::InvalidValue {
            var: "REQUEST_TIMEOUT_MS".into(),
            reason: format!("must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"),
        });
    }

    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::InvalidValue {
            var: "MAX_RETRIES".into(),
            reason: format!("must be at most {MAX_RETRIES}"),
        });
    }

    if !(1..=7).contains(&config.min_rating) {
        return Err(ConfigError::InvalidValue {
            var: "MIN_RATING".into(),
            reason: "must be between 1 and 7".into(),
        });
    }

    if !(1..=MAX_BATCH_SIZE).contains(&config.batch_size) {
        return Err(ConfigError::InvalidValue {
            var: "RETRAIN_BATCH_SIZE".into(),
            reason: format!("must be between 1 and {MAX_BATCH_SIZE}"),
        });
    }

    if config.base_model.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            var: "BASE_MODEL".into(),
            reason: "must not be empty".into(),
        });
    }

    if config.trigger_interval_secs == 0 {
        return Err(ConfigError::InvalidValue {
            var: "TRIGGER_INTERVAL_SECS".into(),
            reason: "must be at least 1".into(),
        });
    }

    if config.reconcile_interval_secs == 0 {
        return Err(ConfigError::InvalidValue {
            var: "RECONCILE_INTERVAL_SECS".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(())
}
