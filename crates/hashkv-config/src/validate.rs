//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{BackendKind, Config, ConnectionMode};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_store(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_store(config: &Config) -> ConfigResult<()> {
    let store = &config.store;

    if store.namespace.trim().is_empty() {
        return Err(invalid("store.namespace", "namespace must not be empty"));
    }
    if store.namespace.contains('\0') {
        return Err(invalid(
            "store.namespace",
            "namespace must not contain null bytes",
        ));
    }

    match store.backend {
        BackendKind::Redis => {
            if store.redis.address.trim().is_empty() {
                return Err(invalid(
                    "store.redis.address",
                    "address is required when backend is redis",
                ));
            }
            if store.redis.mode == ConnectionMode::Pooled && store.redis.pool.max_size == 0 {
                return Err(invalid(
                    "store.redis.pool.max_size",
                    "max_size must be at least 1",
                ));
            }
        },
        BackendKind::Memory => {
            if store.memory.page_size == 0 {
                return Err(invalid(
                    "store.memory.page_size",
                    "page_size must be at least 1",
                ));
            }
        },
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;

    if !LOG_LEVELS.contains(&logging.level.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: {}",
                logging.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if !LOG_FORMATS.contains(&logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: {}",
                logging.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }

    Ok(())
}
