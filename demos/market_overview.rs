use crypto_market_sdk::{ChartRange, ListingFilter, MarketDashboard, SortKey, SortOrder};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Needs COINGECKO_API_KEY in the environment
    let dashboard = MarketDashboard::global().await?;
    let coin_id = std::env::args().nth(1).unwrap_or_else(|| "bitcoin".to_string());

    println!("Market overview (provider: {})", dashboard.provider_name());
    println!("-------------------------------------------");

    // 1. Top movers on the first page
    let start = Instant::now();
    let filter = ListingFilter::default().sorted_by(SortKey::Change24h, SortOrder::Desc);
    match dashboard.markets_page(1, &filter).await {
        Ok(page) => {
            println!("1. Top movers (page {}/{}, {:?}):", page.page, page.total_pages, start.elapsed());
            for coin in page.coins.iter().take(10) {
                println!(
                    "   #{:<4} {:<8} ${:>14.4} {:>+7.2}%",
                    coin.market_cap_rank.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
                    coin.symbol.to_uppercase(),
                    coin.current_price,
                    coin.price_change_percentage_24h.unwrap_or_default()
                );
            }
        }
        Err(e) => eprintln!("   Error: could not load markets: {}", e),
    }
    println!();

    // 2. Coin detail
    match dashboard.coin_detail(&coin_id).await {
        Ok(detail) => {
            println!("2. {} ({})", detail.name, detail.symbol.to_uppercase());
            println!("   Price:      ${:.2}", detail.market_data.current_price);
            println!("   Market cap: ${:.0}", detail.market_data.market_cap);
            println!("   Volume 24h: ${:.0}", detail.market_data.total_volume);
        }
        Err(e) => eprintln!("2. Error: could not load {}: {}", coin_id, e),
    }
    println!();

    // 3. 24h chart, which may be served from the 7-day range
    let start = Instant::now();
    match dashboard.price_series(&coin_id, ChartRange::OneDay).await {
        Ok(series) => {
            println!(
                "3. Chart: {} points over {} day(s){} in {:?}",
                series.prices.len(),
                series.served,
                if series.is_fallback() { " (fallback)" } else { "" },
                start.elapsed()
            );
            if let Some(change) = series.change_percentage() {
                println!("   Change over window: {:+.2}%", change);
            }
        }
        Err(e) => eprintln!("3. Chart unavailable: {}", e),
    }
    println!();

    // 4. Watchlist
    let watched = dashboard.toggle_watchlist(&coin_id).await?;
    println!(
        "4. {} {} the watchlist ({} entries)",
        coin_id,
        if watched { "added to" } else { "removed from" },
        dashboard.watchlist().len().await
    );
    println!();

    let metrics = dashboard.metrics().await;
    let health = dashboard.health_check().await;
    println!("-------------------------------------------");
    println!(
        "Requests: {} ({} failed), p50={:.0}ms p99={:.0}ms, fallbacks={}",
        metrics.total_requests,
        metrics.failed_requests,
        metrics.latency_p50_ms,
        metrics.latency_p99_ms,
        metrics.chart_fallbacks
    );
    println!("Health: {:?} - {}", health.status, health.message.unwrap_or_default());

    Ok(())
}
