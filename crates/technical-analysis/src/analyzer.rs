use screener_core::{GrowthSummary, PriceSeries};
use serde::{Deserialize, Serialize};

use crate::indicators::*;

/// Indicator values at the most recent observation of a series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub last_close: Option<f64>,
    pub ma_50: Option<f64>,
    pub ma_200: Option<f64>,
    pub rsi: Option<f64>,
    pub growth: GrowthSummary,
    pub points: usize,
}

pub struct TechnicalAnalysisEngine {
    rsi_period: usize,
}

impl TechnicalAnalysisEngine {
    pub fn new() -> Self {
        Self {
            rsi_period: RSI_PERIOD,
        }
    }

    pub fn with_rsi_period(mut self, period: usize) -> Self {
        self.rsi_period = period;
        self
    }

    pub fn analyze(&self, series: &PriceSeries) -> TechnicalSnapshot {
        let closes = series.closes();
        let (ma50_window, ma50_min) = MA_50;
        let (ma200_window, ma200_min) = MA_200;

        TechnicalSnapshot {
            last_close: closes.last().copied(),
            ma_50: moving_average(&closes, ma50_window, ma50_min),
            ma_200: moving_average(&closes, ma200_window, ma200_min),
            rsi: rsi(&closes, self.rsi_period),
            growth: growth_summary(&closes),
            points: closes.len(),
        }
    }
}

impl Default for TechnicalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use screener_core::Bar;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 21, 0, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 1_000_000.0,
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn test_empty_series_has_no_values() {
        let snap = TechnicalAnalysisEngine::new().analyze(&PriceSeries::default());
        assert_eq!(snap, TechnicalSnapshot::default());
    }

    #[test]
    fn test_short_series_only_fills_what_it_can() {
        let closes: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let snap = TechnicalAnalysisEngine::new().analyze(&series(&closes));

        assert_eq!(snap.last_close, Some(10.0));
        assert_eq!(snap.ma_50, None);
        assert_eq!(snap.ma_200, None);
        assert_eq!(snap.rsi, None);
        assert!(snap.growth.one_day.is_some());
        assert!(snap.growth.one_week.is_some());
        assert_eq!(snap.growth.one_year, None);
        assert!((snap.growth.all_time.unwrap() - 900.0).abs() < 1e-9);
        assert_eq!(snap.points, 10);
    }

    #[test]
    fn test_ma_50_available_from_twenty_points() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 3) as f64).collect();
        let snap = TechnicalAnalysisEngine::new().analyze(&series(&closes));

        let expected = closes.iter().sum::<f64>() / closes.len() as f64;
        assert!((snap.ma_50.unwrap() - expected).abs() < 1e-9);
        assert_eq!(snap.ma_200, None);
        assert!(snap.rsi.is_some());
    }

    #[test]
    fn test_long_series_fills_everything() {
        let closes: Vec<f64> = (0..300)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1)
            .collect();
        let snap = TechnicalAnalysisEngine::new().analyze(&series(&closes));

        assert!(snap.ma_50.is_some());
        assert!(snap.ma_200.is_some());
        let rsi = snap.rsi.unwrap();
        assert!((0.0..=100.0).contains(&rsi));
        assert!(snap.growth.one_year.is_some());
    }
}
