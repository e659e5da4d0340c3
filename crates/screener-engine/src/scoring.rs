use fundamental_analysis::{FundamentalAnalysisEngine, ValuationScore};
use screener_core::{
    Fundamentals, MarketData, Recommendation, ScoreResult, ScreenerError, SignalSet,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use technical_analysis::{TechnicalAnalysisEngine, TechnicalSnapshot};

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;

const PE_TIER_LOW: f64 = 15.0;
const PE_TIER_HIGH: f64 = 25.0;

/// How the valuation side enters the composite score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringPolicy {
    /// Technical score plus half the five-rule valuation score.
    #[default]
    WeightedBlend,
    /// Technical score plus a P/E tier bonus; the valuation score is reported
    /// but not blended.
    PeTiers,
}

impl ScoringPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringPolicy::WeightedBlend => "weighted-blend",
            ScoringPolicy::PeTiers => "pe-tiers",
        }
    }
}

impl fmt::Display for ScoringPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringPolicy {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted-blend" | "weighted_blend" | "blend" => Ok(ScoringPolicy::WeightedBlend),
            "pe-tiers" | "pe_tiers" | "tiers" => Ok(ScoringPolicy::PeTiers),
            other => Err(ScreenerError::InvalidData(format!(
                "unknown scoring policy '{}' (expected weighted-blend or pe-tiers)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeScore {
    pub score: f64,
    pub technical: f64,
    pub valuation: ValuationScore,
    pub signals: SignalSet,
}

pub struct CompositeScorer {
    policy: ScoringPolicy,
    fundamental: FundamentalAnalysisEngine,
}

impl CompositeScorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self {
            policy,
            fundamental: FundamentalAnalysisEngine::new(),
        }
    }

    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }

    pub fn score(&self, snapshot: &TechnicalSnapshot, fundamentals: &Fundamentals) -> CompositeScore {
        let mut signals = SignalSet::new();
        let mut technical = 0.0;

        if let Some(close) = snapshot.last_close {
            if matches!(snapshot.ma_50, Some(ma) if close > ma) {
                technical += 1.0;
                signals.push("price>50MA");
            }
            if matches!(snapshot.ma_200, Some(ma) if close > ma) {
                technical += 1.0;
                signals.push("price>200MA");
            }
        }

        match snapshot.rsi {
            Some(rsi) if rsi < RSI_OVERSOLD => {
                technical += 1.0;
                signals.push("RSI<30");
            }
            Some(rsi) if rsi > RSI_OVERBOUGHT => {
                technical -= 1.0;
                signals.push("RSI>70");
            }
            _ => {}
        }

        let valuation = self.fundamental.score(fundamentals);

        let score = match self.policy {
            ScoringPolicy::WeightedBlend => technical + valuation.score / 2.0,
            ScoringPolicy::PeTiers => technical + pe_tier_bonus(fundamentals, &mut signals),
        };

        CompositeScore {
            score,
            technical,
            valuation,
            signals,
        }
    }
}

impl Default for CompositeScorer {
    fn default() -> Self {
        Self::new(ScoringPolicy::default())
    }
}

fn pe_tier_bonus(fundamentals: &Fundamentals, signals: &mut SignalSet) -> f64 {
    let Some(pe) = fundamentals.pe().filter(|pe| pe.is_finite()) else {
        return 0.0;
    };

    if pe < PE_TIER_LOW {
        signals.push("PE<15");
        1.0
    } else if pe <= PE_TIER_HIGH {
        signals.push("PE 15-25");
        0.5
    } else {
        signals.push("PE>25");
        -0.5
    }
}

/// Indicators, scoring and labeling for a single ticker.
pub struct ScoringPipeline {
    technical: TechnicalAnalysisEngine,
    scorer: CompositeScorer,
}

impl ScoringPipeline {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self {
            technical: TechnicalAnalysisEngine::new(),
            scorer: CompositeScorer::new(policy),
        }
    }

    pub fn policy(&self) -> ScoringPolicy {
        self.scorer.policy()
    }

    pub fn score_ticker(
        &self,
        symbol: &str,
        data: &MarketData,
        leverage: bool,
    ) -> Result<ScoreResult, ScreenerError> {
        if data.series.is_empty() {
            return Err(ScreenerError::InsufficientData(format!(
                "no price history for {}",
                symbol
            )));
        }

        let fundamentals = data.fundamentals.clone().sanitized();
        let snapshot = self.technical.analyze(&data.series);
        let composite = self.scorer.score(&snapshot, &fundamentals);

        tracing::debug!(
            "{}: technical={:.2} valuation={:.2} score={:.2} [{}]",
            symbol,
            composite.technical,
            composite.valuation.score,
            composite.score,
            composite.signals
        );

        Ok(ScoreResult {
            ticker: symbol.to_string(),
            score: composite.score,
            valuation_score: Some(composite.valuation.score),
            price: snapshot.last_close,
            pe: fundamentals.pe(),
            pb: fundamentals.price_to_book,
            beta: fundamentals.beta,
            dividend_yield: fundamentals.dividend_yield,
            market_cap: fundamentals.market_cap,
            debt_to_equity: fundamentals.debt_to_equity,
            sector: fundamentals.sector,
            industry: fundamentals.industry,
            rsi: snapshot.rsi,
            growth: snapshot.growth,
            signals: composite.signals,
            recommendation: Recommendation::from_score(composite.score, leverage),
            failed: false,
        })
    }
}

impl Default for ScoringPipeline {
    fn default() -> Self {
        Self::new(ScoringPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use screener_core::{Bar, GrowthSummary, PriceSeries};

    fn snapshot(close: f64, ma_50: Option<f64>, ma_200: Option<f64>, rsi: Option<f64>) -> TechnicalSnapshot {
        TechnicalSnapshot {
            last_close: Some(close),
            ma_50,
            ma_200,
            rsi,
            growth: GrowthSummary::default(),
            points: 300,
        }
    }

    fn value_stock() -> Fundamentals {
        Fundamentals {
            trailing_pe: Some(12.0),
            price_to_book: Some(2.0),
            dividend_yield: Some(0.03),
            beta: Some(1.0),
            debt_to_equity: Some(50.0),
            ..Default::default()
        }
    }

    fn series(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 21, 0, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 10_000.0,
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn test_technical_rules_and_order() {
        let scorer = CompositeScorer::default();
        let result = scorer.score(&snapshot(110.0, Some(100.0), Some(90.0), Some(25.0)), &Fundamentals::default());

        assert_eq!(result.technical, 3.0);
        assert_eq!(result.score, 3.0);
        let tags: Vec<&str> = result.signals.iter().collect();
        assert_eq!(tags, vec!["price>50MA", "price>200MA", "RSI<30"]);
    }

    #[test]
    fn test_overbought_subtracts() {
        let scorer = CompositeScorer::default();
        let result = scorer.score(&snapshot(110.0, Some(120.0), None, Some(75.0)), &Fundamentals::default());

        assert_eq!(result.score, -1.0);
        assert!(result.signals.contains("RSI>70"));
        assert!(!result.signals.contains("price>50MA"));
    }

    #[test]
    fn test_rsi_boundaries_fire_nothing() {
        let scorer = CompositeScorer::default();
        for rsi in [30.0, 70.0, 50.0] {
            let result = scorer.score(&snapshot(1.0, None, None, Some(rsi)), &Fundamentals::default());
            assert_eq!(result.score, 0.0, "rsi {}", rsi);
            assert!(result.signals.is_empty());
        }
    }

    #[test]
    fn test_absent_indicators_fire_nothing() {
        let scorer = CompositeScorer::default();
        let result = scorer.score(&TechnicalSnapshot::default(), &Fundamentals::default());

        assert_eq!(result.score, 0.0);
        assert!(result.signals.is_empty());
    }

    #[test]
    fn test_close_equal_to_average_does_not_fire() {
        let scorer = CompositeScorer::default();
        let result = scorer.score(&snapshot(100.0, Some(100.0), Some(100.0), None), &Fundamentals::default());
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_score_monotonic_in_each_rule() {
        let scorer = CompositeScorer::default();
        let base = scorer.score(&snapshot(100.0, Some(120.0), Some(120.0), Some(50.0)), &value_stock()).score;

        let above_50 = scorer.score(&snapshot(100.0, Some(90.0), Some(120.0), Some(50.0)), &value_stock()).score;
        let above_200 = scorer.score(&snapshot(100.0, Some(120.0), Some(90.0), Some(50.0)), &value_stock()).score;
        let oversold = scorer.score(&snapshot(100.0, Some(120.0), Some(120.0), Some(20.0)), &value_stock()).score;

        assert!(above_50 > base);
        assert!(above_200 > base);
        assert!(oversold > base);
    }

    #[test]
    fn test_weighted_blend_adds_half_valuation() {
        let scorer = CompositeScorer::new(ScoringPolicy::WeightedBlend);
        let result = scorer.score(&TechnicalSnapshot::default(), &value_stock());

        assert_eq!(result.valuation.score, 4.5);
        assert_eq!(result.score, 2.25);
    }

    #[test]
    fn test_pe_tiers() {
        let scorer = CompositeScorer::new(ScoringPolicy::PeTiers);
        let snap = snapshot(100.0, Some(90.0), None, Some(25.0));

        let cases = [(12.0, 3.0, "PE<15"), (15.0, 2.5, "PE 15-25"), (25.0, 2.5, "PE 15-25"), (40.0, 1.5, "PE>25")];
        for (pe, expected, tag) in cases {
            let f = Fundamentals {
                trailing_pe: Some(pe),
                price_to_book: Some(1.0),
                ..Default::default()
            };
            let result = scorer.score(&snap, &f);
            assert_eq!(result.score, expected, "pe {}", pe);
            assert_eq!(result.signals.iter().last(), Some(tag));
            // still reported, never blended
            assert_eq!(result.valuation.score, if pe < 15.0 { 2.0 } else { 1.0 });
        }

        let no_pe = scorer.score(&snap, &Fundamentals::default());
        assert_eq!(no_pe.score, 2.0);
        assert!(!no_pe.signals.iter().any(|s| s.starts_with("PE")));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("weighted-blend".parse::<ScoringPolicy>().unwrap(), ScoringPolicy::WeightedBlend);
        assert_eq!("PE-TIERS".parse::<ScoringPolicy>().unwrap(), ScoringPolicy::PeTiers);
        assert!("median".parse::<ScoringPolicy>().is_err());
        assert_eq!(ScoringPolicy::PeTiers.to_string(), "pe-tiers");
    }

    #[test]
    fn test_pipeline_rejects_empty_history() {
        let pipeline = ScoringPipeline::default();
        let err = pipeline.score_ticker("BYND", &MarketData::default(), false).unwrap_err();
        assert!(matches!(err, ScreenerError::InsufficientData(_)));
    }

    #[test]
    fn test_pipeline_fills_result() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 - if i % 4 == 0 { 3.0 } else { 0.0 }).collect();
        let data = MarketData {
            series: series(&closes),
            fundamentals: Fundamentals {
                sector: Some("Manufacturing".to_string()),
                market_cap: Some(2.0e9),
                ..value_stock()
            },
        };

        let result = ScoringPipeline::default().score_ticker("XOM", &data, true).unwrap();

        assert_eq!(result.ticker, "XOM");
        assert!(!result.failed);
        assert_eq!(result.price, Some(159.0));
        assert_eq!(result.pe, Some(12.0));
        assert_eq!(result.valuation_score, Some(4.5));
        assert_eq!(result.sector.as_deref(), Some("Manufacturing"));
        assert!(result.signals.contains("price>50MA"));
        // 200-day average needs 50 points; we have 60
        assert!(result.signals.contains("price>200MA"));
        assert_eq!(result.growth.one_year, None);
        assert_eq!(result.recommendation, Recommendation::from_score(result.score, true));
    }

    #[test]
    fn test_pipeline_short_history_degrades() {
        let data = MarketData {
            series: series(&[10.0, 11.0, 12.0]),
            fundamentals: Fundamentals::default(),
        };

        let result = ScoringPipeline::default().score_ticker("NIO", &data, false).unwrap();
        assert_eq!(result.rsi, None);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.recommendation, Recommendation::Neutral);
        assert!(result.growth.one_day.is_some());
        assert_eq!(result.growth.one_week, None);
    }
}
