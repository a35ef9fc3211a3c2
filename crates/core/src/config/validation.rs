//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: &str) -> Self {
        ConfigError::Invalid { field: field.into(), reason: reason.into() }
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_retries` or `max_redirects` is 0 or above 20
    /// - `retry_backoff_ms` exceeds one minute
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `namespace` or `user_agent` is empty, or `namespace` contains a path separator
    /// - `proxy`, `http_proxy` or `https_proxy` is set but is not a URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if !(1..=20).contains(&self.max_retries) {
            return Err(ConfigError::invalid("max_retries", "must be between 1 and 20"));
        }
        if !(1..=20).contains(&self.max_redirects) {
            return Err(ConfigError::invalid("max_redirects", "must be between 1 and 20"));
        }

        if self.retry_backoff_ms > 60_000 {
            return Err(ConfigError::invalid("retry_backoff_ms", "must not exceed 60000ms"));
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.namespace.is_empty() {
            return Err(ConfigError::invalid("namespace", "must not be empty"));
        }
        if self.namespace.contains(['/', '\\', '\0']) {
            return Err(ConfigError::invalid("namespace", "must not contain path separators"));
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::invalid("user_agent", "must not be empty"));
        }

        for (field, proxy) in [("proxy", &self.proxy), ("http_proxy", &self.http_proxy), ("https_proxy", &self.https_proxy)] {
            if let Some(proxy) = proxy
                && !proxy.contains("://")
            {
                return Err(ConfigError::invalid(field, "must be a URL such as http://host:port"));
            }
        }

        Ok(())
    }
}
