use screener_core::GrowthSummary;

/// (window, min_periods) for the 50-day moving average
pub const MA_50: (usize, usize) = (50, 20);
/// (window, min_periods) for the 200-day moving average
pub const MA_200: (usize, usize) = (200, 50);

pub const RSI_PERIOD: usize = 14;

pub const ONE_DAY: Horizon = Horizon::Points(1);
pub const ONE_WEEK: Horizon = Horizon::Points(5);
pub const ONE_YEAR: Horizon = Horizon::Points(252);

/// Trailing simple moving average at the last observation.
///
/// Averages the last `window` closes, or all of them while the series is
/// still shorter than the window, once at least `min_periods` points exist.
pub fn moving_average(data: &[f64], window: usize, min_periods: usize) -> Option<f64> {
    if window == 0 || min_periods == 0 || data.len() < min_periods {
        return None;
    }

    let tail = &data[data.len().saturating_sub(window)..];
    Some(tail.iter().sum::<f64>() / tail.len() as f64)
}

/// Relative Strength Index at the last observation.
///
/// Uses simple means of the last `period` gains and losses. Returns `None`
/// with fewer than `period + 1` closes, or when the mean loss is zero and the
/// ratio would be unbounded.
pub fn rsi(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period + 1 {
        return None;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;

    for w in data[data.len() - period - 1..].windows(2) {
        let change = w[1] - w[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses += change.abs();
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return None;
    }

    let rs = avg_gain / avg_loss;
    let value = 100.0 - (100.0 / (1.0 + rs));
    value.is_finite().then_some(value)
}

/// Lookback for a growth measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    /// Compare against the close this many points before the last one
    Points(usize),
    /// Compare against the first close in the series
    AllTime,
}

/// Percentage change from the horizon's baseline close to the last close.
pub fn growth(data: &[f64], horizon: Horizon) -> Option<f64> {
    let last = *data.last()?;

    let past = match horizon {
        Horizon::Points(h) => {
            if data.len() < h + 1 {
                return None;
            }
            data[data.len() - 1 - h]
        }
        Horizon::AllTime => data[0],
    };

    if past == 0.0 {
        return None;
    }

    let pct = (last - past) / past * 100.0;
    pct.is_finite().then_some(pct)
}

pub fn growth_summary(data: &[f64]) -> GrowthSummary {
    GrowthSummary {
        one_day: growth(data, ONE_DAY),
        one_week: growth(data, ONE_WEEK),
        one_year: growth(data, ONE_YEAR),
        all_time: growth(data, Horizon::AllTime),
    }
}
