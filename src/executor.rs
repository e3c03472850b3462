//! Rate-limited request executor
//!
//! Issues GET requests against the upstream API and owns all retry policy:
//!
//! ```text
//! attempt 0 ──fail──▶ wait backoff ──▶ wait backoff*1 ──▶ attempt 1 ──fail──▶ ...
//!     │
//!     └──429──▶ wait rate_limit_wait ──▶ same attempt again (bounded budget)
//! ```
//!
//! A 429 does not consume a counted attempt. Each request gets
//! `max_rate_limit_retries` free 429 retries; once spent, a 429 counts as a
//! normal failure. A single `execute` call therefore issues at most
//! `max_attempts + max_rate_limit_retries` physical requests.

use crate::{
    config::{ApiConfig, RetryPolicy},
    constants::API_KEY_HEADER,
    error::ApiError,
    metrics::MetricsCollector,
    transport::{HttpTransport, ReqwestTransport},
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;

/// Executes requests with linear backoff and 429 handling
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    api_key: String,
    policy: RetryPolicy,
    metrics: Arc<MetricsCollector>,
}

impl RequestExecutor {
    /// Creates an executor backed by reqwest
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates an executor over a custom transport
    pub fn with_transport(config: &ApiConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            policy: config.retry,
            metrics: Arc::new(MetricsCollector::new("coingecko")),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Executes a GET against `path` (query string already embedded)
    ///
    /// Returns the raw JSON body. Retryable failures are retried up to the
    /// attempt ceiling and the last one is returned; anything else (such as a
    /// body that is not JSON) is returned immediately.
    pub async fn execute(&self, path: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let max_attempts = self.policy.attempts();
        let mut rate_limit_budget = self.policy.max_rate_limit_retries;

        tracing::debug!(url = %url, "Executing API request");

        for attempt in 0..max_attempts {
            if attempt > 0 {
                sleep(self.policy.delay_before_attempt(attempt)).await;
            }

            match self.attempt(&url, &mut rate_limit_budget).await {
                Ok(payload) => return Ok(payload),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = max_attempts,
                        error = %e,
                        "API request attempt failed"
                    );

                    if attempt + 1 >= max_attempts {
                        return Err(e);
                    }
                    sleep(self.policy.failure_delay()).await;
                }
            }
        }

        Err(ApiError::invalid_response("Max retries exceeded"))
    }

    /// One counted attempt: loops on 429 while the rate-limit budget lasts
    async fn attempt(&self, url: &str, rate_limit_budget: &mut u32) -> Result<Value, ApiError> {
        let headers = [(API_KEY_HEADER, self.api_key.as_str())];

        loop {
            let start = Instant::now();
            let response = match self.transport.get(url, &headers).await {
                Ok(response) => response,
                Err(e) => {
                    self.metrics.record_request(start.elapsed(), false).await;
                    return Err(e);
                }
            };
            self.metrics
                .record_request(start.elapsed(), response.is_success())
                .await;

            if response.is_rate_limited() {
                self.metrics.record_rate_limited().await;
                if *rate_limit_budget == 0 {
                    return Err(ApiError::RateLimited);
                }
                *rate_limit_budget -= 1;

                tracing::info!(
                    wait_ms = self.policy.rate_limit_wait_ms,
                    remaining = *rate_limit_budget,
                    "Rate limited, waiting"
                );
                sleep(self.policy.rate_limit_wait()).await;
                continue;
            }

            if !response.is_success() {
                return Err(ApiError::http(response.status, response.status_text));
            }

            tracing::debug!(
                latency_ms = start.elapsed().as_millis() as u64,
                bytes = response.body.len(),
                "API request succeeded"
            );

            return serde_json::from_str(&response.body).map_err(|e| {
                ApiError::invalid_response(format!("Response from {} is not JSON: {}", url, e))
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use std::time::Duration;

    fn executor(transport: &Arc<MockTransport>, policy: RetryPolicy) -> RequestExecutor {
        let config = ApiConfig::new("test-key")
            .with_base_url("https://api.test/v3")
            .with_retry(policy);
        RequestExecutor::with_transport(&config, transport.clone())
    }

    fn assert_gap(actual: Duration, expected_ms: u64) {
        let expected = Duration::from_millis(expected_ms);
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(10),
            "expected gap of {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failures() {
        for k in 0..3 {
            let transport = Arc::new(MockTransport::new());
            for i in 0..k {
                if i % 2 == 0 {
                    transport.push_status(500);
                } else {
                    transport.push_error("connection reset");
                }
            }
            transport.push_json(r#"{"ok": true}"#);

            let payload = executor(&transport, RetryPolicy::default())
                .execute("/ping")
                .await
                .unwrap();

            assert_eq!(payload, serde_json::json!({"ok": true}));
            assert_eq!(transport.call_count(), k + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_return_last_error() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_status(500)
            .push_error("connection reset")
            .push_status(503);

        let err = executor(&transport, RetryPolicy::default())
            .execute("/ping")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Http { status: 503, .. }));
        assert_eq!(err.to_string(), "API request failed: 503 Service Unavailable");
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_linear_backoff_between_attempts() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(500).push_status(500).push_json("[]");

        executor(&transport, RetryPolicy::default())
            .execute("/ping")
            .await
            .unwrap();

        // failure delay + backoff * attempt
        let gaps = transport.gaps();
        assert_eq!(gaps.len(), 2);
        assert_gap(gaps[0], 2000 + 2000);
        assert_gap(gaps[1], 2000 + 4000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_fixed_delay() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(429).push_json("{}");

        executor(&transport, RetryPolicy::default())
            .execute("/ping")
            .await
            .unwrap();

        let gaps = transport.gaps();
        assert_eq!(gaps.len(), 1);
        assert_gap(gaps[0], 5000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_does_not_consume_attempt() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_status(500)
            .push_status(429)
            .push_status(500)
            .push_json("{}");

        let result = executor(&transport, RetryPolicy::default())
            .execute("/ping")
            .await;

        assert!(result.is_ok());
        assert_eq!(transport.call_count(), 4);

        let gaps = transport.gaps();
        assert_gap(gaps[0], 4000);
        assert_gap(gaps[1], 5000);
        assert_gap(gaps[2], 6000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_budget_bounds_requests() {
        let transport = Arc::new(MockTransport::new());
        for _ in 0..20 {
            transport.push_status(429);
        }

        let exec = executor(&transport, RetryPolicy::default());
        let err = exec.execute("/ping").await.unwrap_err();

        assert!(matches!(err, ApiError::RateLimited));
        assert_eq!(transport.call_count(), 6);
        assert_eq!(exec.metrics().get_metrics().await.rate_limited, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_api_key_and_builds_url() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json("{}");

        executor(&transport, RetryPolicy::default())
            .execute("/coins/bitcoin")
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].url, "https://api.test/v3/coins/bitcoin");
        assert_eq!(
            calls[0].headers,
            vec![(API_KEY_HEADER.to_string(), "test-key".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_json_is_not_retried() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json("<html>oops</html>").push_json("{}");

        let err = executor(&transport, RetryPolicy::default())
            .execute("/ping")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidResponse(_)));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_issues_one_request() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(500).push_json("{}");

        let err = executor(&transport, RetryPolicy::new(0, 10, 10))
            .execute("/ping")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Http { status: 500, .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_count_physical_requests() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(502).push_json("{}");

        let exec = executor(&transport, RetryPolicy::default());
        exec.execute("/ping").await.unwrap();

        let metrics = exec.metrics().get_metrics().await;
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.failed_requests, 1);
    }
}
