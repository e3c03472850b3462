//! Market data provider implementations

pub mod coingecko;

pub use coingecko::CoinGeckoClient;
