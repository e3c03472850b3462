//! Error types for the crypto market data client

use thiserror::Error;

/// Errors that can occur when talking to the upstream market data API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network request failed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Transport-level failure reported by a non-reqwest transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-2xx, non-429 status
    #[error("API request failed: {status} {status_text}")]
    Http { status: u16, status_text: String },

    /// Upstream kept answering 429 after the rate-limit budget was spent
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Requested listing page is beyond the supported ceiling
    #[error("Page limit exceeded for free tier: page {page} > {max}")]
    PageLimitExceeded { page: u32, max: u32 },

    /// Request arguments rejected before any network call
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Chart endpoint answered successfully but without price points
    #[error("No chart data available for {id} over {days} day(s)")]
    EmptyChart { id: String, days: &'static str },

    /// The 1-day chart failed and so did its 7-day fallback
    #[error("{fallback}")]
    FallbackExhausted {
        primary: Box<ApiError>,
        #[source]
        fallback: Box<ApiError>,
    },

    /// Invalid response from the API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Creates an Http error
    pub fn http(status: u16, status_text: impl Into<String>) -> Self {
        Self::Http {
            status,
            status_text: status_text.into(),
        }
    }

    /// Creates an InvalidResponse error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Creates an InvalidRequest error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Returns true if the executor should spend another attempt on this failure
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Transport(_) | Self::Http { .. } | Self::RateLimited
        )
    }
}

/// Errors that can occur when reading or writing the watchlist
#[derive(Debug, Error)]
pub enum WatchlistError {
    /// Backing storage could not be read or written
    #[error("Watchlist storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value is not a JSON array of coin ids
    #[error("Stored watchlist is corrupt: {0}")]
    Corrupt(String),

    /// Watchlist could not be encoded for storage
    #[error("Failed to encode watchlist: {0}")]
    Serialize(#[from] serde_json::Error),
}
