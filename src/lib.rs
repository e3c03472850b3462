//! # Crypto Market SDK
//!
//! Resilient access to the CoinGecko market data API for cryptocurrency
//! dashboards: ranked market listings, per-coin detail, historical price
//! charts, plus a locally persisted watchlist.
//!
//! ## Usage
//!
//! ```no_run
//! use crypto_market_sdk::{ApiConfig, ChartRange, CoinGeckoClient, MarketDataProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads COINGECKO_API_KEY (and optional overrides) from the environment
//! let client = CoinGeckoClient::new(&ApiConfig::from_env()?)?;
//!
//! let coins = client.fetch_market_listing(1, 50).await?;
//! for coin in &coins {
//!     println!("{}: ${:.2}", coin.symbol, coin.current_price);
//! }
//!
//! let chart = client.fetch_price_series("bitcoin", ChartRange::OneDay).await?;
//! if chart.is_fallback() {
//!     println!("24h chart unavailable, showing {} days", chart.served);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! MarketDashboard (filters, watchlist, health)
//!     ↓
//! MarketDataProvider (CoinGeckoClient: page ceiling, intervals, chart fallback)
//!     ↓
//! RequestExecutor (linear backoff, 429 waits, attempt ceiling)
//!     ↓
//! HttpTransport (reqwest)
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use crypto_market_sdk::{ApiError, CoinGeckoClient, MarketDataProvider};
//!
//! # async fn example(client: CoinGeckoClient) {
//! match client.fetch_market_listing(21, 50).await {
//!     Ok(coins) => println!("{} coins", coins.len()),
//!     Err(ApiError::PageLimitExceeded { page, max }) => {
//!         println!("page {} is past the last page ({})", page, max)
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod executor;
pub mod fallback;
pub mod filter;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod transport;
pub mod types;
pub mod watchlist;

// Re-export commonly used types
pub use config::{ApiConfig, ChartPolicy, RetryPolicy};
pub use dashboard::MarketDashboard;
pub use error::{ApiError, WatchlistError};
pub use executor::RequestExecutor;
pub use filter::{ListingFilter, SortKey, SortOrder, ValueRange};
pub use metrics::ApiMetrics;
pub use provider::MarketDataProvider;
pub use providers::CoinGeckoClient;
pub use types::{
    ChartInterval, ChartRange, CoinDetail, ComponentHealth, HealthStatus, ListingPage,
    MarketListing, MarketSnapshot, PricePoint, PriceSeries, SearchResults,
};
pub use watchlist::{FileStore, KeyValueStore, MemoryStore, WatchlistStore};
