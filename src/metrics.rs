//! Request metrics for the upstream API
//!
//! Tracks latency percentiles and success rates of physical requests, plus
//! counters for rate-limited responses and chart fallbacks.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples to keep for metrics calculation
const MAX_SAMPLES: usize = 100;

/// Snapshot of request metrics
#[derive(Debug, Clone)]
pub struct ApiMetrics {
    /// Name of the upstream
    pub provider_name: String,
    /// 50th percentile latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Physical requests issued (lifetime)
    pub total_requests: u64,
    /// Physical requests that failed, 429s included (lifetime)
    pub failed_requests: u64,
    /// 429 responses received (lifetime)
    pub rate_limited: u64,
    /// 1-day charts served through the 7-day fallback (lifetime)
    pub chart_fallbacks: u64,
}

impl ApiMetrics {
    /// Creates metrics with no data
    pub fn empty(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_requests: 0,
            failed_requests: 0,
            rate_limited: 0,
            chart_fallbacks: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    failed: u64,
    rate_limited: u64,
    chart_fallbacks: u64,
}

/// Collects and computes request metrics
pub struct MetricsCollector {
    provider_name: String,
    /// Rolling window of latency samples
    samples: Arc<RwLock<VecDeque<LatencySample>>>,
    counters: Arc<RwLock<Counters>>,
}

impl MetricsCollector {
    /// Creates a new metrics collector
    pub fn new(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            samples: Arc::new(RwLock::new(VecDeque::with_capacity(MAX_SAMPLES))),
            counters: Arc::new(RwLock::new(Counters::default())),
        }
    }

    /// Records one physical request with its duration and outcome
    pub async fn record_request(&self, duration: Duration, success: bool) {
        let duration_ms = duration.as_secs_f64() * 1000.0;

        {
            let mut counters = self.counters.write().await;
            counters.total += 1;
            if !success {
                counters.failed += 1;
            }
        }

        let mut samples = self.samples.write().await;
        if samples.len() >= MAX_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(LatencySample {
            duration_ms,
            success,
        });
    }

    /// Records a 429 response
    pub async fn record_rate_limited(&self) {
        self.counters.write().await.rate_limited += 1;
    }

    /// Records a chart served by the fallback range
    pub async fn record_chart_fallback(&self) {
        self.counters.write().await.chart_fallbacks += 1;
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> ApiMetrics {
        let samples = self.samples.read().await;
        let counters = self.counters.read().await;

        if samples.is_empty() {
            let mut metrics = ApiMetrics::empty(&self.provider_name);
            metrics.rate_limited = counters.rate_limited;
            metrics.chart_fallbacks = counters.chart_fallbacks;
            return metrics;
        }

        // Percentiles only over successful requests
        let mut latencies: Vec<f64> = samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();

        latencies.sort_by(|a, b| a.total_cmp(b));

        let success_rate = if counters.total > 0 {
            (counters.total - counters.failed) as f64 / counters.total as f64
        } else {
            1.0
        };

        ApiMetrics {
            provider_name: self.provider_name.clone(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_requests: counters.total,
            failed_requests: counters.failed,
            rate_limited: counters.rate_limited,
            chart_fallbacks: counters.chart_fallbacks,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_collector() {
        let collector = MetricsCollector::new("test");

        collector.record_request(Duration::from_millis(100), true).await;
        collector.record_request(Duration::from_millis(200), true).await;
        collector.record_request(Duration::from_millis(150), false).await;
        collector.record_rate_limited().await;
        collector.record_chart_fallback().await;

        let metrics = collector.get_metrics().await;

        assert_eq!(metrics.provider_name, "test");
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.rate_limited, 1);
        assert_eq!(metrics.chart_fallbacks, 1);
        assert!(metrics.success_rate > 0.6 && metrics.success_rate < 0.7);
    }

    #[tokio::test]
    async fn test_rolling_window_is_bounded() {
        let collector = MetricsCollector::new("test");
        for _ in 0..(MAX_SAMPLES + 10) {
            collector.record_request(Duration::from_millis(5), true).await;
        }

        assert_eq!(collector.samples.read().await.len(), MAX_SAMPLES);
        assert_eq!(collector.get_metrics().await.total_requests, (MAX_SAMPLES + 10) as u64);
    }

    #[test]
    fn test_percentile() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        assert_eq!(percentile(&values, 50.0), 5.0);
        assert_eq!(percentile(&values, 99.0), 9.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}
