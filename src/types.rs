//! Types for the crypto market data client

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deserializes a nullable number, mapping `null` to `0.0`
fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// One row of summary market data from the markets listing
///
/// `market_cap_rank` is assigned upstream and never recomputed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketListing {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub current_price: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub market_cap: f64,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub fully_diluted_valuation: Option<f64>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_volume: f64,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub price_change_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub market_cap_change_24h: Option<f64>,
    #[serde(default)]
    pub market_cap_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub max_supply: Option<f64>,
    #[serde(default)]
    pub ath: Option<f64>,
    #[serde(default)]
    pub ath_change_percentage: Option<f64>,
    #[serde(default)]
    pub ath_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub atl: Option<f64>,
    #[serde(default)]
    pub atl_change_percentage: Option<f64>,
    #[serde(default)]
    pub atl_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Image variants for a coin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinImage {
    #[serde(default)]
    pub thumb: String,
    #[serde(default)]
    pub small: String,
    #[serde(default)]
    pub large: String,
}

/// USD market figures nested in a coin detail record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub current_price: f64,
    pub market_cap: f64,
    pub total_volume: f64,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
}

/// Extended single-coin record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    /// English description, empty when upstream has none
    pub description: String,
    pub image: CoinImage,
    pub market_cap_rank: Option<u32>,
    pub market_data: MarketSnapshot,
}

/// Look-back window for a historical chart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartRange {
    #[serde(rename = "1")]
    OneDay,
    #[default]
    #[serde(rename = "7")]
    SevenDays,
    #[serde(rename = "30")]
    ThirtyDays,
    #[serde(rename = "90")]
    NinetyDays,
}

impl ChartRange {
    /// Day count as sent in the `days` query parameter
    pub fn days(&self) -> &'static str {
        match self {
            ChartRange::OneDay => "1",
            ChartRange::SevenDays => "7",
            ChartRange::ThirtyDays => "30",
            ChartRange::NinetyDays => "90",
        }
    }

    /// Short label for range selectors
    pub fn label(&self) -> &'static str {
        match self {
            ChartRange::OneDay => "24H",
            ChartRange::SevenDays => "7D",
            ChartRange::ThirtyDays => "30D",
            ChartRange::NinetyDays => "90D",
        }
    }

    /// Sampling interval requested for this range
    pub fn interval(&self) -> ChartInterval {
        match self {
            ChartRange::OneDay => ChartInterval::Hourly,
            _ => ChartInterval::Daily,
        }
    }

    /// Get all supported ranges
    pub fn all() -> &'static [ChartRange] {
        &[
            ChartRange::OneDay,
            ChartRange::SevenDays,
            ChartRange::ThirtyDays,
            ChartRange::NinetyDays,
        ]
    }
}

impl fmt::Display for ChartRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.days())
    }
}

impl FromStr for ChartRange {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartRange::all()
            .iter()
            .copied()
            .find(|range| range.days() == s.trim())
            .ok_or_else(|| ApiError::invalid_request(format!("unsupported chart range: {:?}", s)))
    }
}

/// Chart sampling granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartInterval {
    Hourly,
    Daily,
}

impl ChartInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartInterval::Hourly => "hourly",
            ChartInterval::Daily => "daily",
        }
    }
}

/// One `(timestamp, value)` sample; the timestamp is epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp_ms: i64,
    pub value: f64,
}

impl PricePoint {
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }

    /// Sample time, `None` if the timestamp is out of range
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }
}

/// Price, market cap and volume history over one look-back window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub id: String,
    /// Range the caller asked for
    pub requested: ChartRange,
    /// Range that actually produced the data
    pub served: ChartRange,
    pub prices: Vec<PricePoint>,
    pub market_caps: Vec<PricePoint>,
    pub total_volumes: Vec<PricePoint>,
}

impl PriceSeries {
    /// True when the data came from the fallback range
    pub fn is_fallback(&self) -> bool {
        self.requested != self.served
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Most recent price sample
    pub fn latest_price(&self) -> Option<f64> {
        self.prices.last().map(|p| p.value)
    }

    /// Percentage change from the first to the last price sample
    pub fn change_percentage(&self) -> Option<f64> {
        let first = self.prices.first()?.value;
        let last = self.prices.last()?.value;
        if first == 0.0 {
            return None;
        }
        Some((last - first) / first * 100.0)
    }
}

/// One coin hit from the search endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub thumb: Option<String>,
}

/// Coin hits from the search endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub coins: Vec<SearchCoin>,
}

/// One filtered page of the markets view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingPage {
    pub page: u32,
    pub total_pages: u32,
    pub coins: Vec<MarketListing>,
}

/// Overall system health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Upstream requests are succeeding
    Healthy,
    /// Some requests fail but data still flows
    Degraded,
    /// Most requests fail
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
