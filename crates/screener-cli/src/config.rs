use anyhow::{bail, Context, Result};
use screener_engine::{ScoringPolicy, DEFAULT_CONCURRENCY, DEFAULT_TICKERS, MAX_CONCURRENCY};
use std::env;

const DEFAULT_RATE_LIMIT: usize = 500;
const DEFAULT_HISTORY_DAYS: i64 = 3650;

#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    pub polygon_api_key: String,
    pub polygon_rate_limit: usize, // requests per minute
    pub tickers: Vec<String>,
    pub concurrency: usize,
    pub history_days: i64,
    pub leverage: bool,
    pub policy: ScoringPolicy,
}

impl ScreenerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let polygon_api_key = lookup("POLYGON_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .context("POLYGON_API_KEY must be set")?;

        let polygon_rate_limit = match lookup("POLYGON_RATE_LIMIT") {
            Some(raw) => parse_positive(&raw).context("POLYGON_RATE_LIMIT must be a positive integer")?,
            None => DEFAULT_RATE_LIMIT,
        };

        let tickers = match lookup("SCREENER_TICKERS") {
            Some(raw) => parse_tickers(&raw),
            None => DEFAULT_TICKERS.iter().map(|s| s.to_string()).collect(),
        };
        if tickers.is_empty() {
            bail!("SCREENER_TICKERS is set but names no tickers");
        }

        let concurrency = match lookup("SCREENER_CONCURRENCY") {
            Some(raw) => parse_concurrency(&raw).context("invalid SCREENER_CONCURRENCY")?,
            None => DEFAULT_CONCURRENCY,
        };

        let history_days = match lookup("SCREENER_HISTORY_DAYS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|d| *d > 0)
                .with_context(|| format!("SCREENER_HISTORY_DAYS must be a positive number of days, got '{}'", raw))?,
            None => DEFAULT_HISTORY_DAYS,
        };

        let leverage = match lookup("SCREENER_LEVERAGE") {
            Some(raw) => parse_bool(&raw).with_context(|| format!("SCREENER_LEVERAGE must be true or false, got '{}'", raw))?,
            None => false,
        };

        let policy = match lookup("SCREENER_POLICY") {
            Some(raw) => raw.parse::<ScoringPolicy>().context("invalid SCREENER_POLICY")?,
            None => ScoringPolicy::default(),
        };

        Ok(Self {
            polygon_api_key,
            polygon_rate_limit,
            tickers,
            concurrency,
            history_days,
            leverage,
            policy,
        })
    }
}

/// Comma-separated symbols, trimmed and upper-cased; blanks are dropped.
pub fn parse_tickers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_positive(raw: &str) -> Result<usize> {
    let value: usize = raw.trim().parse().with_context(|| format!("'{}' is not a number", raw))?;
    if value == 0 {
        bail!("value must be greater than zero");
    }
    Ok(value)
}

/// A positive worker count no larger than [`MAX_CONCURRENCY`].
pub fn parse_concurrency(raw: &str) -> Result<usize> {
    let value = parse_positive(raw)?;
    check_concurrency(value)
}

pub fn check_concurrency(value: usize) -> Result<usize> {
    match value {
        0 => bail!("concurrency must be greater than zero"),
        v if v > MAX_CONCURRENCY => bail!("concurrency {} exceeds the maximum of {}", v, MAX_CONCURRENCY),
        v => Ok(v),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
