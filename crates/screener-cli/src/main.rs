//! stock-screener: score a list of tickers from Polygon data and print them ranked.
//!
//! Usage:
//!   cargo run -p screener-cli -- --tickers AAPL,MSFT,KO
//!   cargo run -p screener-cli -- --leverage --sector "Manufacturing"
//!   cargo run -p screener-cli -- --policy pe-tiers --export results.csv

mod config;
mod display;
mod filter;

use anyhow::{Context, Result};
use clap::Parser;
use polygon_client::{PolygonClient, PolygonDataProvider};
use screener_engine::{export_csv, ScoringPolicy, ScreenerEvent, StockScreener};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use config::{check_concurrency, parse_tickers, ScreenerConfig};
use filter::{ResultFilter, ALL_SECTORS};

#[derive(Parser, Debug)]
#[command(name = "stock-screener")]
#[command(about = "Rank equities by technical and valuation signals", long_about = None)]
struct Args {
    /// Comma-separated tickers (overrides SCREENER_TICKERS)
    #[arg(long)]
    tickers: Option<String>,

    /// Label strong buys as leverage candidates
    #[arg(long)]
    leverage: bool,

    /// Only show this sector
    #[arg(long, default_value = ALL_SECTORS)]
    sector: String,

    /// Only show tickers or sectors containing this text
    #[arg(long)]
    search: Option<String>,

    /// Write all results to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Tickers fetched in parallel
    #[arg(long)]
    concurrency: Option<usize>,

    /// Days of price history to fetch
    #[arg(long)]
    history_days: Option<i64>,

    /// weighted-blend or pe-tiers
    #[arg(long)]
    policy: Option<ScoringPolicy>,

    /// Plain table output even on a terminal
    #[arg(long)]
    no_color: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let mut config = ScreenerConfig::from_env()?;

    if let Some(raw) = &args.tickers {
        let tickers = parse_tickers(raw);
        if tickers.is_empty() {
            anyhow::bail!("--tickers names no tickers");
        }
        config.tickers = tickers;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = check_concurrency(concurrency).context("invalid --concurrency")?;
    }
    if let Some(days) = args.history_days {
        config.history_days = days.max(1);
    }
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    config.leverage |= args.leverage;

    tracing::info!(
        "Screening {} tickers (policy={}, leverage={}, history={}d)",
        config.tickers.len(),
        config.policy,
        config.leverage,
        config.history_days
    );

    let client = PolygonClient::new(config.polygon_api_key.clone(), config.polygon_rate_limit);
    let provider = PolygonDataProvider::new(client).with_history_days(config.history_days);

    let screener = StockScreener::new(Arc::new(provider))
        .with_policy(config.policy)
        .with_leverage(config.leverage)
        .with_concurrency(config.concurrency);

    let mut handle = screener.spawn(config.tickers.clone());
    let cancel = handle.cancel_token();
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = handle.events.recv() => match event {
                Some(event @ ScreenerEvent::Progress { completed, total }) => {
                    tracing::info!(
                        "Progress: {}% ({}/{})",
                        event.percent().unwrap_or(100),
                        completed,
                        total
                    );
                }
                Some(ScreenerEvent::Finished) | None => break,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                tracing::warn!("Interrupted; skipping tickers not yet started");
                cancel.cancel();
                interrupted = true;
            }
        }
    }

    let result = handle.wait().await?;

    let filter = ResultFilter::new(Some(&args.sector), args.search.as_deref());
    let shown = filter.apply(&result.results);

    let colored = !args.no_color && std::io::stdout().is_terminal();
    println!("{}", display::render_table(&shown, colored));
    println!();
    println!(
        "{} shown, {} scored, {} failed{}",
        shown.len(),
        result.total_analyzed - result.total_failed,
        result.total_failed,
        if result.cancelled { " (cancelled)" } else { "" }
    );
    if !result.sectors.is_empty() {
        println!("Sectors: {}", result.sectors.join(", "));
    }

    if let Some(path) = &args.export {
        if export_csv(&result.results, path)? {
            println!("Exported {} results to {}", result.results.len(), path.display());
        } else {
            println!("Nothing to export");
        }
    }

    Ok(())
}
