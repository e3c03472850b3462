//! Market dashboard service
//!
//! Composes a market data provider, the local watchlist and request metrics
//! into the views a dashboard renders. Every call is an independent fetch;
//! discarding results that no longer match the current view is up to the
//! caller.

use crate::{
    config::ApiConfig,
    constants::{
        DEFAULT_PER_PAGE, DEFAULT_WATCHLIST_DIR, MAX_LISTING_PAGE, MAX_PER_PAGE, WATCHLIST_DIR_ENV,
    },
    error::{ApiError, WatchlistError},
    filter::ListingFilter,
    metrics::{ApiMetrics, MetricsCollector},
    provider::MarketDataProvider,
    providers::CoinGeckoClient,
    types::{
        ChartRange, CoinDetail, ComponentHealth, HealthStatus, ListingPage, MarketListing,
        PriceSeries, SearchResults,
    },
    watchlist::{FileStore, WatchlistStore},
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

static GLOBAL_DASHBOARD: OnceCell<Arc<MarketDashboard>> = OnceCell::const_new();

/// Success rate at or above which the upstream counts as healthy
const HEALTHY_SUCCESS_RATE: f64 = 0.9;

/// Success rate below which the upstream counts as unhealthy
const UNHEALTHY_SUCCESS_RATE: f64 = 0.5;

/// Market dashboard service
///
/// # Example
/// ```no_run
/// use crypto_market_sdk::{ChartRange, ListingFilter, MarketDashboard};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let dashboard = MarketDashboard::global().await?;
/// let page = dashboard.markets_page(1, &ListingFilter::default()).await?;
/// for coin in &page.coins {
///     println!("#{:?} {}: ${:.2}", coin.market_cap_rank, coin.name, coin.current_price);
/// }
///
/// let chart = dashboard.price_series("bitcoin", ChartRange::OneDay).await?;
/// println!("{} points over {} day(s)", chart.prices.len(), chart.served);
/// # Ok(())
/// # }
/// ```
pub struct MarketDashboard {
    provider: Arc<dyn MarketDataProvider>,
    watchlist: Arc<WatchlistStore>,
    metrics: Arc<MetricsCollector>,
}

impl MarketDashboard {
    /// Returns the global instance, building it from the environment on first use
    pub async fn global() -> Result<Arc<Self>, ApiError> {
        GLOBAL_DASHBOARD
            .get_or_try_init(|| async { Self::from_env().map(Arc::new) })
            .await
            .cloned()
    }

    /// Builds a CoinGecko-backed dashboard from the environment
    ///
    /// The watchlist is stored under `CRYPTO_WATCHLIST_DIR`, or
    /// `.crypto-market` when unset.
    pub fn from_env() -> Result<Self, ApiError> {
        let config = ApiConfig::from_env()?;
        let dir = std::env::var(WATCHLIST_DIR_ENV)
            .unwrap_or_else(|_| DEFAULT_WATCHLIST_DIR.to_string());

        let provider = Arc::new(CoinGeckoClient::new(&config)?);
        let watchlist = WatchlistStore::open(Arc::new(FileStore::new(&dir)))
            .map_err(|e| ApiError::Config(format!("failed to open watchlist in {}: {}", dir, e)))?;

        tracing::info!(
            base_url = %config.base_url,
            watchlist_dir = %dir,
            "Market dashboard initialized"
        );

        Ok(Self::new(provider, Arc::new(watchlist)))
    }

    /// Creates a dashboard over a custom provider and watchlist
    pub fn new(provider: Arc<dyn MarketDataProvider>, watchlist: Arc<WatchlistStore>) -> Self {
        let metrics = Arc::new(MetricsCollector::new(provider.provider_name()));
        Self {
            provider,
            watchlist,
            metrics,
        }
    }

    /// Records the outcome of one logical operation
    async fn observe<T, F>(&self, operation: &'static str, fut: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let start = Instant::now();
        let result = fut.await;
        self.metrics.record_request(start.elapsed(), result.is_ok()).await;

        if let Err(e) = &result {
            tracing::warn!(
                operation,
                latency_ms = start.elapsed().as_millis() as u64,
                error = %e,
                "Market data request failed"
            );
        }

        result
    }

    /// Fetches one markets page and applies `filter` to it
    pub async fn markets_page(
        &self,
        page: u32,
        filter: &ListingFilter,
    ) -> Result<ListingPage, ApiError> {
        let listings = self
            .observe(
                "markets_page",
                self.provider.fetch_market_listing(page, DEFAULT_PER_PAGE),
            )
            .await?;

        Ok(ListingPage {
            page,
            total_pages: MAX_LISTING_PAGE,
            coins: filter.apply(&listings),
        })
    }

    /// Listing rows for watchlisted coins, in market-cap order
    ///
    /// Only the top page of the listing is searched, so watched coins ranked
    /// below it are absent from the result.
    pub async fn watchlist_listings(&self) -> Result<Vec<MarketListing>, ApiError> {
        let ids = self.watchlist.ids().await;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let listings = self
            .observe(
                "watchlist_listings",
                self.provider.fetch_market_listing(1, MAX_PER_PAGE),
            )
            .await?;

        Ok(listings
            .into_iter()
            .filter(|listing| ids.contains(&listing.id))
            .collect())
    }

    pub async fn coin_detail(&self, id: &str) -> Result<CoinDetail, ApiError> {
        self.observe("coin_detail", self.provider.fetch_coin_detail(id))
            .await
    }

    pub async fn price_series(&self, id: &str, range: ChartRange) -> Result<PriceSeries, ApiError> {
        let series = self
            .observe("price_series", self.provider.fetch_price_series(id, range))
            .await?;

        if series.is_fallback() {
            self.metrics.record_chart_fallback().await;
        }
        Ok(series)
    }

    pub async fn search(&self, query: &str) -> Result<SearchResults, ApiError> {
        self.observe("search", self.provider.search_coins(query))
            .await
    }

    /// Toggles `id` in the watchlist; returns whether it is now watched
    pub async fn toggle_watchlist(&self, id: &str) -> Result<bool, WatchlistError> {
        let watched = self.watchlist.toggle(id).await?;
        tracing::debug!(id, watched, "Toggled watchlist entry");
        Ok(watched)
    }

    pub async fn is_watched(&self, id: &str) -> bool {
        self.watchlist.contains(id).await
    }

    pub fn watchlist(&self) -> &Arc<WatchlistStore> {
        &self.watchlist
    }

    /// Returns the name of the current provider
    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Metrics over the logical operations served so far
    pub async fn metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }

    /// Perform a health check on the dashboard
    pub async fn health_check(&self) -> ComponentHealth {
        let metrics = self.metrics().await;
        let mut details = std::collections::HashMap::new();

        details.insert(
            "provider_name".to_string(),
            serde_json::json!(self.provider_name()),
        );
        details.insert(
            "total_requests".to_string(),
            serde_json::json!(metrics.total_requests),
        );
        details.insert(
            "failed_requests".to_string(),
            serde_json::json!(metrics.failed_requests),
        );
        details.insert(
            "chart_fallbacks".to_string(),
            serde_json::json!(metrics.chart_fallbacks),
        );
        details.insert(
            "watchlist_size".to_string(),
            serde_json::json!(self.watchlist.len().await),
        );

        let status = if metrics.success_rate >= HEALTHY_SUCCESS_RATE {
            HealthStatus::Healthy
        } else if metrics.success_rate >= UNHEALTHY_SUCCESS_RATE {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        let message = match status {
            HealthStatus::Healthy if metrics.total_requests == 0 => {
                "No market data requested yet".to_string()
            }
            HealthStatus::Healthy => "Market data requests are succeeding".to_string(),
            HealthStatus::Degraded | HealthStatus::Unhealthy => format!(
                "{} of {} market data requests failed",
                metrics.failed_requests, metrics.total_requests
            ),
        };

        ComponentHealth {
            name: "market_dashboard".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{SortKey, SortOrder};
    use crate::provider::mock::{listing, MockProvider};

    fn dashboard(provider: &Arc<MockProvider>) -> MarketDashboard {
        MarketDashboard::new(provider.clone(), Arc::new(WatchlistStore::in_memory()))
    }

    fn sample() -> Vec<MarketListing> {
        vec![
            listing("bitcoin", 1, 67000.0, 1.3e12, 1.5),
            listing("ethereum", 2, 3100.0, 3.7e11, -0.4),
            listing("solana", 5, 150.0, 7.0e10, 6.2),
        ]
    }

    #[tokio::test]
    async fn test_markets_page_applies_filter() {
        let provider = Arc::new(MockProvider::new());
        provider.set_listing(sample());
        let dashboard = dashboard(&provider);

        let filter = ListingFilter::default().sorted_by(SortKey::Price, SortOrder::Asc);
        let page = dashboard.markets_page(3, &filter).await.unwrap();

        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 20);
        assert_eq!(page.coins[0].id, "solana");
        assert_eq!(provider.listing_requests(), vec![(3, 50)]);
    }

    #[tokio::test]
    async fn test_empty_watchlist_skips_network() {
        let provider = Arc::new(MockProvider::new());
        provider.set_listing(sample());

        let rows = dashboard(&provider).watchlist_listings().await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_watchlist_listings_keep_market_order() {
        let provider = Arc::new(MockProvider::new());
        provider.set_listing(sample());
        let dashboard = dashboard(&provider);

        assert!(dashboard.toggle_watchlist("solana").await.unwrap());
        assert!(dashboard.toggle_watchlist("bitcoin").await.unwrap());
        assert!(dashboard.is_watched("solana").await);

        let rows = dashboard.watchlist_listings().await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["bitcoin", "solana"]);
        assert_eq!(provider.listing_requests(), vec![(1, 250)]);
    }

    #[tokio::test]
    async fn test_failures_surface_and_degrade_health() {
        let provider = Arc::new(MockProvider::new());
        let dashboard = dashboard(&provider);

        assert_eq!(dashboard.health_check().await.status, HealthStatus::Healthy);

        let err = dashboard
            .price_series("bitcoin", ChartRange::SevenDays)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::EmptyChart { .. }));
        assert!(dashboard.coin_detail("bitcoin").await.is_err());
        assert!(dashboard.search("btc").await.is_ok());

        let metrics = dashboard.metrics().await;
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.failed_requests, 2);

        let health = dashboard.health_check().await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(health.details["provider_name"], serde_json::json!("mock"));
    }
}
