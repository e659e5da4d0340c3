//! `MarketDataProvider` backed by the Polygon REST API.
//!
//! Polygon has no ratio endpoint, so valuation fields are derived from the
//! price history, the latest quarterly filings, ticker details and the
//! dividend history.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use screener_core::{Bar, Fundamentals, MarketData, MarketDataProvider, PriceSeries, ScreenerError};
use std::collections::HashMap;
use tokio::sync::OnceCell;

use crate::{DividendInfo, PolygonClient, QuarterlyFinancials, TickerDetails};

pub const DEFAULT_HISTORY_DAYS: i64 = 3650;
pub const DEFAULT_BENCHMARK: &str = "SPY";

/// Daily returns used for beta (one trading year)
const BETA_LOOKBACK: usize = 252;
const MIN_BETA_RETURNS: usize = 20;
const DIVIDEND_LIMIT: u32 = 12;

pub struct PolygonDataProvider {
    client: PolygonClient,
    history_days: i64,
    benchmark: Option<String>,
    benchmark_bars: OnceCell<Vec<Bar>>,
}

impl PolygonDataProvider {
    pub fn new(client: PolygonClient) -> Self {
        Self {
            client,
            history_days: DEFAULT_HISTORY_DAYS,
            benchmark: Some(DEFAULT_BENCHMARK.to_string()),
            benchmark_bars: OnceCell::new(),
        }
    }

    pub fn with_history_days(mut self, days: i64) -> Self {
        self.history_days = days.max(1);
        self
    }

    /// Benchmark symbol for beta; `None` leaves beta absent.
    pub fn with_benchmark(mut self, benchmark: Option<String>) -> Self {
        self.benchmark = benchmark;
        self
    }

    /// Benchmark bars, fetched once per provider. A failed fetch is cached
    /// as empty so a bad benchmark does not cost one request per ticker.
    async fn benchmark_bars(&self) -> &[Bar] {
        let Some(symbol) = self.benchmark.as_deref() else {
            return &[];
        };

        self.benchmark_bars
            .get_or_init(|| async {
                let to = Utc::now();
                let from = to - Duration::days(self.history_days.min(730));
                match self.client.get_aggregates(symbol, 1, "day", from, to).await {
                    Ok(bars) => {
                        tracing::info!("Benchmark {}: {} bars", symbol, bars.len());
                        bars
                    }
                    Err(e) => {
                        tracing::warn!("Failed to fetch benchmark {}: {}; beta unavailable", symbol, e);
                        Vec::new()
                    }
                }
            })
            .await
    }
}

#[async_trait]
impl MarketDataProvider for PolygonDataProvider {
    async fn fetch(&self, symbol: &str) -> Result<MarketData, ScreenerError> {
        let to = Utc::now();
        let from = to - Duration::days(self.history_days);

        let bars = self.client.get_aggregates(symbol, 1, "day", from, to).await?;
        if bars.is_empty() {
            return Err(ScreenerError::InsufficientData(format!("no price history for {}", symbol)));
        }
        let series = PriceSeries::new(bars)?;

        let (details, financials, dividends) = tokio::join!(
            self.client.get_ticker_details(symbol),
            self.client.get_financials(symbol),
            self.client.get_dividends(symbol, DIVIDEND_LIMIT),
        );

        let details = details
            .map_err(|e| tracing::warn!("{}: ticker details unavailable: {}", symbol, e))
            .ok();
        let financials = financials
            .map_err(|e| tracing::warn!("{}: financials unavailable: {}", symbol, e))
            .unwrap_or_default();
        let dividends = dividends
            .map_err(|e| tracing::warn!("{}: dividends unavailable: {}", symbol, e))
            .unwrap_or_default();

        let benchmark = self.benchmark_bars().await;
        let fundamentals = assemble_fundamentals(&series, details.as_ref(), &financials, &dividends, benchmark);

        tracing::debug!(
            "{}: {} bars, pe={:?}, pb={:?}, beta={:?}",
            symbol,
            series.len(),
            fundamentals.pe(),
            fundamentals.price_to_book,
            fundamentals.beta
        );

        Ok(MarketData { series, fundamentals })
    }
}

/// Derives the fundamentals record from raw Polygon data.
pub fn assemble_fundamentals(
    series: &PriceSeries,
    details: Option<&TickerDetails>,
    financials: &[QuarterlyFinancials],
    dividends: &[DividendInfo],
    benchmark: &[Bar],
) -> Fundamentals {
    let price = series.last_close();
    let latest = financials.first();
    let equity = latest.and_then(|f| f.shareholders_equity).filter(|&e| e > 0.0);
    let market_cap = details.and_then(|d| d.market_cap);

    let trailing_pe = match (price, ttm_eps(financials)) {
        (Some(price), Some(eps)) if eps > 0.0 => Some(price / eps),
        _ => None,
    };

    let price_to_book = match (market_cap, equity) {
        (Some(cap), Some(equity)) => Some(cap / equity),
        _ => None,
    };

    let debt_to_equity = match (latest.and_then(|f| f.total_liabilities), equity) {
        (Some(liabilities), Some(equity)) => Some(liabilities / equity * 100.0),
        _ => None,
    };

    let dividend_yield = match (price, series.bars().last()) {
        (Some(price), Some(last)) if price > 0.0 => {
            trailing_dividends(dividends, last.date()).map(|cash| cash / price)
        }
        _ => None,
    };

    Fundamentals {
        trailing_pe,
        forward_pe: None,
        price_to_book,
        beta: beta(series.bars(), benchmark),
        dividend_yield,
        market_cap,
        debt_to_equity,
        sector: details
            .and_then(|d| d.sic_code.as_deref())
            .and_then(sector_from_sic)
            .map(str::to_string),
        industry: details.and_then(|d| d.sic_description.clone()),
    }
    .sanitized()
}

/// Sum of EPS over the latest four quarters that report it.
fn ttm_eps(financials: &[QuarterlyFinancials]) -> Option<f64> {
    let values: Vec<f64> = financials.iter().take(4).filter_map(|f| f.eps).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum())
    }
}

/// Cash paid with an ex-date in the year ending `as_of`. `None` when Polygon
/// returned no dividend records at all.
fn trailing_dividends(dividends: &[DividendInfo], as_of: NaiveDate) -> Option<f64> {
    if dividends.is_empty() {
        return None;
    }

    let start = as_of - Duration::days(365);
    let total = dividends
        .iter()
        .filter(|d| {
            d.ex_dividend_date
                .as_deref()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .is_some_and(|date| date > start && date <= as_of)
        })
        .filter_map(|d| d.cash_amount)
        .sum();

    Some(total)
}

/// Beta of daily returns against the benchmark over dates both series trade.
pub fn beta(bars: &[Bar], benchmark: &[Bar]) -> Option<f64> {
    let bench_by_date: HashMap<NaiveDate, f64> = benchmark.iter().map(|b| (b.date(), b.close)).collect();

    let aligned: Vec<(f64, f64)> = bars
        .iter()
        .filter_map(|b| bench_by_date.get(&b.date()).map(|&bench| (b.close, bench)))
        .collect();

    let aligned = &aligned[aligned.len().saturating_sub(BETA_LOOKBACK + 1)..];
    let returns: Vec<(f64, f64)> = aligned
        .windows(2)
        .filter(|w| w[0].0 != 0.0 && w[0].1 != 0.0)
        .map(|w| ((w[1].0 - w[0].0) / w[0].0, (w[1].1 - w[0].1) / w[0].1))
        .collect();

    if returns.len() < MIN_BETA_RETURNS {
        return None;
    }

    let n = returns.len() as f64;
    let stock_mean = returns.iter().map(|r| r.0).sum::<f64>() / n;
    let bench_mean = returns.iter().map(|r| r.1).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut bench_variance = 0.0;
    for (stock, bench) in &returns {
        covariance += (stock - stock_mean) * (bench - bench_mean);
        bench_variance += (bench - bench_mean).powi(2);
    }

    if bench_variance == 0.0 {
        return None;
    }

    Some(covariance / bench_variance)
}

/// Maps a SIC code to its top-level division.
pub fn sector_from_sic(sic_code: &str) -> Option<&'static str> {
    let code: u32 = sic_code.trim().parse().ok()?;

    let sector = match code / 100 {
        1..=9 => "Agriculture, Forestry & Fishing",
        10..=14 => "Mining",
        15..=17 => "Construction",
        20..=39 => "Manufacturing",
        40..=49 => "Transportation & Utilities",
        50..=51 => "Wholesale Trade",
        52..=59 => "Retail Trade",
        60..=67 => "Finance, Insurance & Real Estate",
        70..=89 => "Services",
        91..=99 => "Public Administration",
        _ => return None,
    };

    Some(sector)
}
