//! Client configuration.
//!
//! [`ClientConfig`] holds everything the request layer needs: the service
//! base address, the per-attempt deadline, and the retry policy. It can be
//! built from defaults, from environment variables via
//! [`ClientConfig::from_env`], and adjusted at runtime with a partial
//! [`ConfigUpdate`].
//!
//! ## Environment Variables
//! - `PR_SUMMARY_API_BASE_URL`: service base address (default: `http://localhost:8000`)
//! - `PR_SUMMARY_API_TIMEOUT_MS`: per-attempt deadline (default: 30000)
//! - `PR_SUMMARY_API_MAX_RETRIES`: retries after the first attempt (default: 3)
//! - `PR_SUMMARY_API_RETRY_DELAY_MS`: base backoff delay (default: 1000)
//! - `PR_SUMMARY_API_EXPONENTIAL_BACKOFF`: double the delay per attempt (default: true)
//! - `PR_SUMMARY_API_LOGGING`: emit `tracing` records (default: true)

use crate::backend::backoff::BackoffPolicy;
use crate::error::{Result, SummaryError};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_ADDRESS: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

pub const ENV_BASE_URL: &str = "PR_SUMMARY_API_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "PR_SUMMARY_API_TIMEOUT_MS";
pub const ENV_MAX_RETRIES: &str = "PR_SUMMARY_API_MAX_RETRIES";
pub const ENV_RETRY_DELAY_MS: &str = "PR_SUMMARY_API_RETRY_DELAY_MS";
pub const ENV_EXPONENTIAL_BACKOFF: &str = "PR_SUMMARY_API_EXPONENTIAL_BACKOFF";
pub const ENV_LOGGING: &str = "PR_SUMMARY_API_LOGGING";

/// Configuration for the summary client.
///
/// # Example
///
/// ```
/// use pr_summary_client::config::{ClientConfig, ConfigUpdate};
/// use std::time::Duration;
///
/// let config = ClientConfig::default().merge(
///     ConfigUpdate::default()
///         .with_max_retries(1)
///         .with_timeout(Duration::from_secs(5)),
/// );
/// assert_eq!(config.max_retries, 1);
/// assert_eq!(config.base_address, "http://localhost:8000");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Service base address, without trailing slash.
    pub base_address: String,

    /// Deadline for a single attempt.
    pub timeout: Duration,

    /// Retries after the first attempt. Total attempts never exceed `max_retries + 1`.
    pub max_retries: u32,

    /// Base delay between attempts.
    pub retry_delay: Duration,

    /// When set, the delay doubles on every attempt: `retry_delay * 2^attempt`.
    pub use_exponential_backoff: bool,

    /// Emit `tracing` records for attempts, retries and outcomes.
    pub logging_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_address: DEFAULT_BASE_ADDRESS.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            use_exponential_backoff: true,
            logging_enabled: true,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// unset variables. A variable that is set but unparseable is an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            base_address: env::var(ENV_BASE_URL)
                .map(|v| normalize_base_address(&v))
                .unwrap_or(defaults.base_address),
            timeout: parse_env::<u64>(ENV_TIMEOUT_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            max_retries: parse_env(ENV_MAX_RETRIES)?.unwrap_or(defaults.max_retries),
            retry_delay: parse_env::<u64>(ENV_RETRY_DELAY_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            use_exponential_backoff: parse_env(ENV_EXPONENTIAL_BACKOFF)?
                .unwrap_or(defaults.use_exponential_backoff),
            logging_enabled: parse_env(ENV_LOGGING)?.unwrap_or(defaults.logging_enabled),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no request could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.base_address.trim().is_empty() {
            return Err(SummaryError::InvalidConfig(
                "base address must not be empty".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(SummaryError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply a partial override, returning the merged configuration.
    pub fn merge(mut self, update: ConfigUpdate) -> Self {
        if let Some(base) = update.base_address {
            self.base_address = normalize_base_address(&base);
        }
        if let Some(timeout) = update.timeout {
            self.timeout = timeout;
        }
        if let Some(retries) = update.max_retries {
            self.max_retries = retries;
        }
        if let Some(delay) = update.retry_delay {
            self.retry_delay = delay;
        }
        if let Some(exp) = update.use_exponential_backoff {
            self.use_exponential_backoff = exp;
        }
        if let Some(logging) = update.logging_enabled {
            self.logging_enabled = logging;
        }
        self
    }

    /// Retry policy derived from this configuration.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_retries: self.max_retries,
            base_delay: self.retry_delay,
            exponential: self.use_exponential_backoff,
        }
    }

    /// Join an endpoint path onto the base address.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_address, path.trim_start_matches('/'))
    }
}

/// Partial override for [`ClientConfig`]. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigUpdate {
    pub base_address: Option<String>,
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub use_exponential_backoff: Option<bool>,
    pub logging_enabled: Option<bool>,
}

impl ConfigUpdate {
    pub fn with_base_address(mut self, base: impl Into<String>) -> Self {
        self.base_address = Some(base.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.use_exponential_backoff = Some(enabled);
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging_enabled = Some(enabled);
        self
    }
}

fn normalize_base_address(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SummaryError::InvalidConfig(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}
