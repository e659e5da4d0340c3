use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ScreenerError;

/// Composite score reserved for tickers whose data could not be fetched or scored.
pub const FAILURE_SCORE: f64 = -99.0;

/// Daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Chronologically ascending daily bars with at most one bar per calendar date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Sorts `bars` by timestamp and rejects series that repeat a calendar date.
    pub fn new(mut bars: Vec<Bar>) -> Result<Self, ScreenerError> {
        bars.sort_by_key(|b| b.timestamp);

        if let Some(dup) = bars.windows(2).find(|w| w[0].date() == w[1].date()) {
            return Err(ScreenerError::InvalidData(format!(
                "duplicate bar for {}",
                dup[1].date()
            )));
        }

        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Flat fundamentals record. Every field may be absent, and absence is never
/// the same thing as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub beta: Option<f64>,
    /// Fraction, 0.03 = 3%
    pub dividend_yield: Option<f64>,
    pub market_cap: Option<f64>,
    /// Percent, 50.0 = 0.5x
    pub debt_to_equity: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

impl Fundamentals {
    /// P/E used for scoring: trailing when present, forward otherwise.
    pub fn pe(&self) -> Option<f64> {
        self.trailing_pe.or(self.forward_pe)
    }

    /// Drops NaN and infinite values so malformed fields read as absent.
    /// Blank names and the `-` placeholder are absent too.
    pub fn sanitized(self) -> Self {
        fn finite(v: Option<f64>) -> Option<f64> {
            v.filter(|x| x.is_finite())
        }
        fn non_blank(s: Option<String>) -> Option<String> {
            s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty() && s != "-")
        }

        Self {
            trailing_pe: finite(self.trailing_pe),
            forward_pe: finite(self.forward_pe),
            price_to_book: finite(self.price_to_book),
            beta: finite(self.beta),
            dividend_yield: finite(self.dividend_yield),
            market_cap: finite(self.market_cap),
            debt_to_equity: finite(self.debt_to_equity),
            sector: non_blank(self.sector),
            industry: non_blank(self.industry),
        }
    }
}

/// Everything a provider returns for one ticker.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    pub series: PriceSeries,
    pub fundamentals: Fundamentals,
}

/// Fired-signal tags in the order they fired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSet(Vec<String>);

impl SignalSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, tag: impl Into<String>) {
        self.0.push(tag.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Splits a `;`-joined list back into tags, skipping empty segments.
    pub fn parse_joined(joined: &str) -> Self {
        Self(
            joined
                .split(';')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl fmt::Display for SignalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(";"))
    }
}

impl<S: Into<String>> FromIterator<S> for SignalSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Percentage growth of the last close over fixed horizons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthSummary {
    pub one_day: Option<f64>,
    pub one_week: Option<f64>,
    pub one_year: Option<f64>,
    pub all_time: Option<f64>,
}

/// Qualitative label derived from a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    StrongBuy { leverage: bool },
    BuyHold,
    Neutral,
    Avoid,
}

impl Recommendation {
    /// Lower bounds are inclusive. NaN maps to `Avoid`.
    pub fn from_score(score: f64, leverage: bool) -> Self {
        match score {
            s if s >= 2.0 => Recommendation::StrongBuy { leverage },
            s if s >= 1.0 => Recommendation::BuyHold,
            s if s >= 0.0 => Recommendation::Neutral,
            _ => Recommendation::Avoid,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy { leverage: true } => "Strong Buy (consider leverage)",
            Recommendation::StrongBuy { leverage: false } => "Strong Buy",
            Recommendation::BuyHold => "Buy / Hold",
            Recommendation::Neutral => "Neutral",
            Recommendation::Avoid => "Avoid / Risky",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label())
    }
}

impl FromStr for Recommendation {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Strong Buy (consider leverage)" => Ok(Recommendation::StrongBuy { leverage: true }),
            "Strong Buy" => Ok(Recommendation::StrongBuy { leverage: false }),
            "Buy / Hold" => Ok(Recommendation::BuyHold),
            "Neutral" => Ok(Recommendation::Neutral),
            "Avoid / Risky" => Ok(Recommendation::Avoid),
            other => Err(ScreenerError::InvalidData(format!(
                "unknown recommendation '{}'",
                other
            ))),
        }
    }
}

/// One scored ticker from a screener run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub ticker: String,
    pub score: f64,
    pub valuation_score: Option<f64>,
    pub price: Option<f64>,
    pub pe: Option<f64>,
    pub pb: Option<f64>,
    pub beta: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub market_cap: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub rsi: Option<f64>,
    pub growth: GrowthSummary,
    pub signals: SignalSet,
    pub recommendation: Recommendation,
    pub failed: bool,
}

impl ScoreResult {
    /// Sentinel for a ticker that could not be scored; `reason` becomes the only signal.
    pub fn failure(ticker: &str, reason: impl Into<String>) -> Self {
        let mut signals = SignalSet::new();
        signals.push(reason);

        Self {
            ticker: ticker.to_string(),
            score: FAILURE_SCORE,
            valuation_score: None,
            price: None,
            pe: None,
            pb: None,
            beta: None,
            dividend_yield: None,
            market_cap: None,
            debt_to_equity: None,
            sector: None,
            industry: None,
            rsi: None,
            growth: GrowthSummary::default(),
            signals,
            recommendation: Recommendation::from_score(FAILURE_SCORE, false),
            failed: true,
        }
    }

    /// Failure reason for sentinel results.
    pub fn failure_reason(&self) -> Option<&str> {
        if self.failed {
            self.signals.iter().next()
        } else {
            None
        }
    }
}
