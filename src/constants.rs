//! Constants for the crypto market data client
//!
//! Defaults for every tunable live here. Runtime overrides go through
//! [`ApiConfig`](crate::config::ApiConfig), which starts from these values.

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Header carrying the CoinGecko demo API key
pub const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "COINGECKO_API_KEY";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "COINGECKO_BASE_URL";

/// Environment variable overriding the retry ceiling
pub const MAX_ATTEMPTS_ENV: &str = "COINGECKO_MAX_ATTEMPTS";

/// Quote currency for every market figure
pub const QUOTE_CURRENCY: &str = "usd";

/// HTTP request timeout (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum number of counted attempts per request
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Linear backoff unit between attempts (in milliseconds)
pub const BACKOFF_MS: u64 = 2000;

/// Fixed wait after an HTTP 429 response (in milliseconds)
pub const RATE_LIMIT_WAIT_MS: u64 = 5000;

/// Delay paid once before every chart request (in milliseconds)
pub const CHART_PRE_DELAY_MS: u64 = 1000;

/// Delay before the 7-day chart fallback request (in milliseconds)
pub const CHART_FALLBACK_DELAY_MS: u64 = 2000;

/// Highest listing page served on the free tier
pub const MAX_LISTING_PAGE: u32 = 20;

/// Listing rows per page for the markets view
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Largest page size the markets endpoint accepts
pub const MAX_PER_PAGE: u32 = 250;

/// Storage key for the persisted watchlist
pub const WATCHLIST_KEY: &str = "crypto-watchlist";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "crypto-market-sdk/0.1.0";

/// Environment variable naming the watchlist directory
pub const WATCHLIST_DIR_ENV: &str = "CRYPTO_WATCHLIST_DIR";

/// Watchlist directory when none is configured
pub const DEFAULT_WATCHLIST_DIR: &str = ".crypto-market";
