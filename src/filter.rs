//! Client-side search, filter and sort over a fetched listing page

use crate::types::MarketListing;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Column a listing is sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    #[serde(rename = "market_cap_rank")]
    Rank,
    #[serde(rename = "current_price")]
    Price,
    #[serde(rename = "price_change_percentage_24h")]
    Change24h,
    MarketCap,
    #[serde(rename = "total_volume")]
    Volume,
}

impl SortKey {
    fn value(&self, listing: &MarketListing) -> Option<f64> {
        match self {
            SortKey::Rank => listing.market_cap_rank.map(f64::from),
            SortKey::Price => Some(listing.current_price),
            SortKey::Change24h => listing.price_change_percentage_24h,
            SortKey::MarketCap => Some(listing.market_cap),
            SortKey::Volume => Some(listing.total_volume),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Inclusive bounds; an unset side does not constrain
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ValueRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// A missing value only passes an inactive range
    fn contains(&self, value: Option<f64>) -> bool {
        if !self.is_active() {
            return true;
        }
        let Some(value) = value else {
            return false;
        };
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Search and filter criteria for the markets view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingFilter {
    pub search: String,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    pub price_range: ValueRange,
    pub market_cap_range: ValueRange,
    pub change_range: ValueRange,
}

impl ListingFilter {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn sorted_by(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort_by = key;
        self.sort_order = order;
        self
    }

    /// Number of range filters with at least one bound set
    pub fn active_filter_count(&self) -> usize {
        [self.price_range, self.market_cap_range, self.change_range]
            .iter()
            .filter(|range| range.is_active())
            .count()
    }

    fn matches(&self, listing: &MarketListing) -> bool {
        let needle = self.search.trim().to_lowercase();
        let search_hit = needle.is_empty()
            || listing.name.to_lowercase().contains(&needle)
            || listing.symbol.to_lowercase().contains(&needle);

        search_hit
            && self.price_range.contains(Some(listing.current_price))
            && self.market_cap_range.contains(Some(listing.market_cap))
            && self.change_range.contains(listing.price_change_percentage_24h)
    }

    /// Returns the matching rows in sort order; rows without a sort value go last
    pub fn apply(&self, listings: &[MarketListing]) -> Vec<MarketListing> {
        let mut filtered: Vec<MarketListing> = listings
            .iter()
            .filter(|listing| self.matches(listing))
            .cloned()
            .collect();

        filtered.sort_by(|a, b| {
            match (self.sort_by.value(a), self.sort_by.value(b)) {
                (Some(x), Some(y)) => match self.sort_order {
                    SortOrder::Asc => x.total_cmp(&y),
                    SortOrder::Desc => y.total_cmp(&x),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });

        filtered
    }
}
