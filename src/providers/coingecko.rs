//! CoinGecko market data provider implementation

use crate::{
    config::{ApiConfig, ChartPolicy},
    constants::{MAX_LISTING_PAGE, MAX_PER_PAGE, QUOTE_CURRENCY},
    error::ApiError,
    executor::RequestExecutor,
    fallback,
    provider::MarketDataProvider,
    transport::HttpTransport,
    types::{
        ChartRange, CoinDetail, CoinImage, MarketListing, MarketSnapshot, PricePoint, PriceSeries,
        SearchResults,
    },
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::sleep;

/// `{"usd": 1.0, "eur": 0.9, ...}` reduced to the USD quote
#[derive(Debug, Default, Deserialize)]
struct UsdQuote {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LocalizedText {
    #[serde(default)]
    en: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MarketDataResponse {
    #[serde(default)]
    current_price: UsdQuote,
    #[serde(default)]
    market_cap: UsdQuote,
    #[serde(default)]
    total_volume: UsdQuote,
    #[serde(default)]
    high_24h: UsdQuote,
    #[serde(default)]
    low_24h: UsdQuote,
    #[serde(default)]
    price_change_24h: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    circulating_supply: Option<f64>,
    #[serde(default)]
    total_supply: Option<f64>,
    #[serde(default)]
    max_supply: Option<f64>,
}

/// CoinGecko `/coins/{id}` response
#[derive(Debug, Deserialize)]
struct CoinDetailResponse {
    id: String,
    symbol: String,
    name: String,
    #[serde(default)]
    description: LocalizedText,
    #[serde(default)]
    image: CoinImage,
    #[serde(default)]
    market_cap_rank: Option<u32>,
    #[serde(default)]
    market_data: Option<MarketDataResponse>,
}

impl From<CoinDetailResponse> for CoinDetail {
    fn from(raw: CoinDetailResponse) -> Self {
        let market = raw.market_data.unwrap_or_default();

        Self {
            id: raw.id,
            symbol: raw.symbol,
            name: raw.name,
            description: raw.description.en.unwrap_or_default(),
            image: raw.image,
            market_cap_rank: raw.market_cap_rank,
            market_data: MarketSnapshot {
                current_price: market.current_price.usd.unwrap_or_default(),
                market_cap: market.market_cap.usd.unwrap_or_default(),
                total_volume: market.total_volume.usd.unwrap_or_default(),
                high_24h: market.high_24h.usd,
                low_24h: market.low_24h.usd,
                price_change_24h: market.price_change_24h,
                price_change_percentage_24h: market.price_change_percentage_24h,
                circulating_supply: market.circulating_supply,
                total_supply: market.total_supply,
                max_supply: market.max_supply,
            },
        }
    }
}

/// CoinGecko `/coins/{id}/market_chart` response
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    #[serde(default)]
    prices: Vec<(i64, f64)>,
    #[serde(default)]
    market_caps: Vec<(i64, f64)>,
    #[serde(default)]
    total_volumes: Vec<(i64, f64)>,
}

fn into_points(raw: Vec<(i64, f64)>) -> Vec<PricePoint> {
    let mut points: Vec<PricePoint> = raw
        .into_iter()
        .map(|(timestamp_ms, value)| PricePoint::new(timestamp_ms, value))
        .collect();
    points.sort_by_key(|p| p.timestamp_ms);
    points
}

fn decode<T: DeserializeOwned>(payload: Value, what: &str) -> Result<T, ApiError> {
    serde_json::from_value(payload)
        .map_err(|e| ApiError::invalid_response(format!("Failed to parse {}: {}", what, e)))
}

fn require_id(id: &str) -> Result<&str, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::invalid_request("coin id must not be empty"));
    }
    Ok(id)
}

/// CoinGecko market data client
pub struct CoinGeckoClient {
    executor: RequestExecutor,
    chart: ChartPolicy,
}

impl CoinGeckoClient {
    /// Creates a new CoinGecko client
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        Ok(Self {
            executor: RequestExecutor::new(config)?,
            chart: config.chart,
        })
    }

    /// Creates a client from `COINGECKO_*` environment variables
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(&ApiConfig::from_env()?)
    }

    /// Creates a client over a custom transport
    pub fn with_transport(config: &ApiConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            executor: RequestExecutor::with_transport(config, transport),
            chart: config.chart,
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn markets_path(page: u32, per_page: u32) -> String {
        format!(
            "/coins/markets?vs_currency={}&order=market_cap_desc&per_page={}&page={}&sparkline=false&price_change_percentage=24h",
            QUOTE_CURRENCY, per_page, page
        )
    }

    fn chart_path(id: &str, range: ChartRange) -> String {
        format!(
            "/coins/{}/market_chart?vs_currency={}&days={}&interval={}",
            urlencoding::encode(id),
            QUOTE_CURRENCY,
            range.days(),
            range.interval().as_str()
        )
    }

    /// One chart request for `served`; an empty price series is an error
    async fn request_chart(
        &self,
        id: &str,
        requested: ChartRange,
        served: ChartRange,
    ) -> Result<PriceSeries, ApiError> {
        let payload = self.executor.execute(&Self::chart_path(id, served)).await?;
        let chart: MarketChartResponse = decode(payload, "market chart")?;

        if chart.prices.is_empty() {
            return Err(ApiError::EmptyChart {
                id: id.to_string(),
                days: served.days(),
            });
        }

        Ok(PriceSeries {
            id: id.to_string(),
            requested,
            served,
            prices: into_points(chart.prices),
            market_caps: into_points(chart.market_caps),
            total_volumes: into_points(chart.total_volumes),
        })
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoClient {
    async fn fetch_market_listing(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<MarketListing>, ApiError> {
        if page > MAX_LISTING_PAGE {
            return Err(ApiError::PageLimitExceeded {
                page,
                max: MAX_LISTING_PAGE,
            });
        }
        if page == 0 {
            return Err(ApiError::invalid_request("pages start at 1"));
        }
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(ApiError::invalid_request(format!(
                "per_page must be between 1 and {}, got {}",
                MAX_PER_PAGE, per_page
            )));
        }

        let payload = self
            .executor
            .execute(&Self::markets_path(page, per_page))
            .await?;
        let listings: Vec<MarketListing> = decode(payload, "market listing")?;

        tracing::debug!(page, count = listings.len(), "Fetched market listing");

        Ok(listings)
    }

    async fn fetch_coin_detail(&self, id: &str) -> Result<CoinDetail, ApiError> {
        let id = require_id(id)?;
        let payload = self
            .executor
            .execute(&format!("/coins/{}", urlencoding::encode(id)))
            .await?;
        let raw: CoinDetailResponse = decode(payload, "coin detail")?;

        Ok(raw.into())
    }

    async fn fetch_price_series(
        &self,
        id: &str,
        range: ChartRange,
    ) -> Result<PriceSeries, ApiError> {
        let id = require_id(id)?;

        // Paid once per call, retries and fallback included
        sleep(self.chart.pre_delay()).await;

        let series = fallback::run(range, self.chart.fallback_delay(), move |served| {
            self.request_chart(id, range, served)
        })
        .await?;

        if series.is_fallback() {
            self.executor.metrics().record_chart_fallback().await;
        }

        tracing::debug!(
            id,
            requested = %series.requested,
            served = %series.served,
            points = series.prices.len(),
            "Fetched price series"
        );

        Ok(series)
    }

    async fn search_coins(&self, query: &str) -> Result<SearchResults, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchResults::default());
        }

        let payload = self
            .executor
            .execute(&format!("/search?query={}", urlencoding::encode(query)))
            .await?;

        decode(payload, "search results")
    }

    fn provider_name(&self) -> &'static str {
        "coingecko"
    }
}
