//! Provider abstraction for the market data endpoints

use crate::{
    error::ApiError,
    types::{ChartRange, CoinDetail, MarketListing, PriceSeries, SearchResults},
};
use async_trait::async_trait;

/// Trait for market data providers
///
/// Every operation is stateless per call. Failures carry a human-readable
/// message suitable for an inline error or toast.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches one page of coins ordered by descending market cap
    ///
    /// # Arguments
    /// * `page` - 1-based page number, at most 20
    /// * `per_page` - rows per page, 1 to 250
    async fn fetch_market_listing(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<MarketListing>, ApiError>;

    /// Fetches the full record for a single coin
    async fn fetch_coin_detail(&self, id: &str) -> Result<CoinDetail, ApiError>;

    /// Fetches price, market cap and volume history for a coin
    ///
    /// A failed or empty 1-day request is retried once as a 7-day request,
    /// so a 1-day call may cost up to twice the executor's attempt ceiling.
    async fn fetch_price_series(&self, id: &str, range: ChartRange)
        -> Result<PriceSeries, ApiError>;

    /// Searches coins by name or symbol
    async fn search_coins(&self, query: &str) -> Result<SearchResults, ApiError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}
