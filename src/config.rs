//! Runtime configuration for the API access layer
//!
//! Every value defaults to the matching constant in [`crate::constants`].
//! Tests inject tiny delays through the builder methods on [`ApiConfig`].

use crate::{
    constants::{
        API_KEY_ENV, BACKOFF_MS, BASE_URL_ENV, CHART_FALLBACK_DELAY_MS, CHART_PRE_DELAY_MS,
        COINGECKO_API_URL, MAX_ATTEMPTS_ENV, MAX_RETRY_ATTEMPTS, RATE_LIMIT_WAIT_MS,
        REQUEST_TIMEOUT_SECS,
    },
    error::ApiError,
};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Retry and backoff policy for the request executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Counted attempts before the last error is surfaced
    pub max_attempts: u32,
    /// Linear backoff unit in milliseconds
    pub backoff_ms: u64,
    /// Fixed wait after a 429 response in milliseconds
    pub rate_limit_wait_ms: u64,
    /// 429 responses absorbed per request before they count as failures
    pub max_rate_limit_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            backoff_ms: BACKOFF_MS,
            rate_limit_wait_ms: RATE_LIMIT_WAIT_MS,
            max_rate_limit_retries: MAX_RETRY_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt ceiling and delays
    pub fn new(max_attempts: u32, backoff_ms: u64, rate_limit_wait_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
            rate_limit_wait_ms,
            max_rate_limit_retries: max_attempts,
        }
    }

    /// Attempt ceiling, never less than one
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait paid before attempt `attempt` (0-based): `backoff * attempt`
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
    }

    /// Wait paid right after a counted failure
    pub fn failure_delay(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Wait paid after a 429 response
    pub fn rate_limit_wait(&self) -> Duration {
        Duration::from_millis(self.rate_limit_wait_ms)
    }
}

/// Delays specific to the historical chart endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChartPolicy {
    /// Paid once per chart call, before the first request
    pub pre_delay_ms: u64,
    /// Paid before the 7-day fallback request
    pub fallback_delay_ms: u64,
}

impl Default for ChartPolicy {
    fn default() -> Self {
        Self {
            pre_delay_ms: CHART_PRE_DELAY_MS,
            fallback_delay_ms: CHART_FALLBACK_DELAY_MS,
        }
    }
}

impl ChartPolicy {
    pub fn pre_delay(&self) -> Duration {
        Duration::from_millis(self.pre_delay_ms)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }
}

fn default_base_url() -> String {
    COINGECKO_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

/// Connection settings for the upstream API
#[derive(Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub chart: ChartPolicy,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("retry", &self.retry)
            .field("chart", &self.chart)
            .finish()
    }
}

impl ApiConfig {
    /// Creates a config with default endpoints and policies
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            api_key: api_key.into(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            chart: ChartPolicy::default(),
        }
    }

    /// Loads the config from the process environment
    ///
    /// `COINGECKO_API_KEY` is required. `COINGECKO_BASE_URL` and
    /// `COINGECKO_MAX_ATTEMPTS` override their defaults when set.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ApiError::Config(format!("{} is not set", API_KEY_ENV)))?;

        let mut config = Self::new(api_key);

        if let Some(base_url) = lookup(BASE_URL_ENV) {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup(MAX_ATTEMPTS_ENV) {
            config.retry.max_attempts = raw.trim().parse().map_err(|_| {
                ApiError::Config(format!("{} must be a positive integer, got {:?}", MAX_ATTEMPTS_ENV, raw))
            })?;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_chart(mut self, chart: ChartPolicy) -> Self {
        self.chart = chart;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
