//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FEEDGRAB_*)
//! 2. TOML config file (if FEEDGRAB_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::store::{DEFAULT_NAMESPACE, default_base_path, store_path};

mod validation;

pub use validation::ConfigError;

const HTTP_PROXY_VARS: &[&str] = &["http_proxy", "HTTP_PROXY"];
const HTTPS_PROXY_VARS: &[&str] = &["https_proxy", "HTTPS_PROXY"];
const NO_PROXY_VARS: &[&str] = &["no_proxy", "NO_PROXY"];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FEEDGRAB_*)
/// 2. TOML config file (if FEEDGRAB_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory below which the namespace directory is created.
    ///
    /// Set via FEEDGRAB_BASE_PATH environment variable. Defaults to the
    /// user's home directory.
    #[serde(default)]
    pub base_path: Option<PathBuf>,

    /// Name of the hidden directory holding session stores.
    ///
    /// Set via FEEDGRAB_NAMESPACE environment variable.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via FEEDGRAB_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for one attempt (all redirect hops included), in milliseconds.
    ///
    /// Set via FEEDGRAB_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Total attempts made when a fetch times out.
    ///
    /// Set via FEEDGRAB_MAX_RETRIES environment variable.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum number of requests issued while following redirects.
    ///
    /// Set via FEEDGRAB_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Pause between timed-out attempts, in milliseconds.
    ///
    /// Set via FEEDGRAB_RETRY_BACKOFF_MS environment variable.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via FEEDGRAB_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Proxy for all outbound requests, whatever the scheme.
    ///
    /// Set via FEEDGRAB_PROXY environment variable. Takes precedence over
    /// the per-scheme proxies.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Proxy for `http://` requests.
    ///
    /// Set via FEEDGRAB_HTTP_PROXY, falling back to `http_proxy`.
    #[serde(default)]
    pub http_proxy: Option<String>,

    /// Proxy for `https://` requests.
    ///
    /// Set via FEEDGRAB_HTTPS_PROXY, falling back to `https_proxy`.
    #[serde(default)]
    pub https_proxy: Option<String>,

    /// Comma-separated hosts, domains and IP ranges reached directly.
    ///
    /// Set via FEEDGRAB_NO_PROXY, falling back to `no_proxy`.
    #[serde(default)]
    pub no_proxy: Option<String>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.into()
}

fn default_user_agent() -> String {
    "feedgrab/0.1".into()
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_max_retries() -> u32 {
    4
}

fn default_max_redirects() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            namespace: default_namespace(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            max_redirects: default_max_redirects(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_bytes: default_max_bytes(),
            proxy: None,
            http_proxy: None,
            https_proxy: None,
            no_proxy: None,
        }
    }
}

impl AppConfig {
    /// Per-attempt timeout as Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Backoff between timed-out attempts as Duration.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Configured base path, or the home directory.
    pub fn resolve_base_path(&self) -> Result<PathBuf, Error> {
        match &self.base_path {
            Some(path) => Ok(path.clone()),
            None => default_base_path(),
        }
    }

    /// Store location for the named session under this configuration.
    pub fn session_store_path(&self, session: &str) -> Result<PathBuf, Error> {
        store_path(&self.resolve_base_path()?, &self.namespace, session)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FEEDGRAB_`
    /// 2. TOML file from `FEEDGRAB_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FEEDGRAB_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FEEDGRAB_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let mut config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        if config.proxy.is_none() {
            config.http_proxy = config.http_proxy.or_else(|| proxy_from_env(HTTP_PROXY_VARS));
            config.https_proxy = config.https_proxy.or_else(|| proxy_from_env(HTTPS_PROXY_VARS));
        }
        config.no_proxy = config.no_proxy.or_else(|| env_value(NO_PROXY_VARS));

        config.validate()?;

        Ok(config)
    }
}

/// First non-empty value among the conventional variables.
fn env_value(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn proxy_from_env(names: &[&str]) -> Option<String> {
    env_value(names).map(|value| if value.contains("://") { value } else { format!("http://{value}") })
}
