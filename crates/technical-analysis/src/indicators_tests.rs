#[cfg(test)]
mod tests {
    use super::super::indicators::*;

    // Helper function to create sample price data
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    #[test]
    fn test_moving_average_full_window() {
        let data: Vec<f64> = (1..=60).map(|i| i as f64).collect();
        let result = moving_average(&data, 50, 20).unwrap();

        // mean of 11..=60
        assert!((result - 35.5).abs() < 1e-9);
    }

    #[test]
    fn test_moving_average_partial_window() {
        let data: Vec<f64> = (1..=25).map(|i| i as f64).collect();
        let result = moving_average(&data, 50, 20).unwrap();

        // fewer points than the window: mean of everything
        assert!((result - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_moving_average_below_min_periods() {
        let data: Vec<f64> = (1..=19).map(|i| i as f64).collect();
        assert_eq!(moving_average(&data, 50, 20), None);

        let data: Vec<f64> = (1..=49).map(|i| i as f64).collect();
        assert_eq!(moving_average(&data, 200, 50), None);
    }

    #[test]
    fn test_moving_average_zero_window() {
        assert_eq!(moving_average(&[1.0, 2.0], 0, 1), None);
        assert_eq!(moving_average(&[], 5, 0), None);
    }

    #[test]
    fn test_rsi_basic() {
        let prices = sample_prices();
        let value = rsi(&prices, 14).unwrap();

        assert!(value > 0.0 && value < 100.0);
    }

    #[test]
    fn test_rsi_matches_hand_computation() {
        let prices = sample_prices();
        let tail = &prices[prices.len() - 15..];
        let (mut up, mut down) = (0.0, 0.0);
        for w in tail.windows(2) {
            let d = w[1] - w[0];
            if d > 0.0 {
                up += d;
            } else {
                down -= d;
            }
        }
        let expected = 100.0 - 100.0 / (1.0 + up / down);

        assert!((rsi(&prices, 14).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let prices: Vec<f64> = (0..14).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi(&prices, 14), None);
        assert_eq!(rsi(&[], 14), None);
        assert_eq!(rsi(&[1.0], 14), None);
    }

    #[test]
    fn test_rsi_no_losses_is_none() {
        let rising: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
        assert_eq!(rsi(&rising, 14), None);

        let flat = vec![50.0; 30];
        assert_eq!(rsi(&flat, 14), None);
    }

    #[test]
    fn test_rsi_only_looks_at_last_period() {
        // losses early on, pure gains in the last 14 deltas
        let mut prices: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        prices.extend((1..=14).map(|i| 81.0 + i as f64));
        assert_eq!(rsi(&prices, 14), None);
    }

    #[test]
    fn test_rsi_all_losses_is_zero() {
        let falling: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let value = rsi(&falling, 14).unwrap();
        assert!(value.abs() < 1e-9);
    }

    #[test]
    fn test_rsi_uptrend_high() {
        let prices: Vec<f64> = (0..30)
            .map(|i| if i % 5 == 4 { 100.0 + i as f64 - 2.0 } else { 100.0 + i as f64 })
            .collect();
        let value = rsi(&prices, 14).unwrap();

        assert!(value > 70.0);
    }

    #[test]
    fn test_growth_exact_horizon_length() {
        for h in [1usize, 5, 252] {
            let mut data = vec![80.0];
            data.extend((0..h).map(|i| 81.0 + i as f64));
            assert_eq!(data.len(), h + 1);

            let last = *data.last().unwrap();
            let expected = (last - 80.0) / 80.0 * 100.0;
            let got = growth(&data, Horizon::Points(h)).unwrap();
            assert!((got - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_growth_too_short() {
        let data = vec![10.0; 5];
        assert_eq!(growth(&data, Horizon::Points(5)), None);
        assert_eq!(growth(&data, Horizon::Points(252)), None);
        assert!(growth(&data, Horizon::Points(4)).is_some());
    }

    #[test]
    fn test_growth_all_time() {
        assert_eq!(growth(&[], Horizon::AllTime), None);
        assert_eq!(growth(&[42.0], Horizon::AllTime), Some(0.0));
        let got = growth(&[50.0, 60.0, 75.0], Horizon::AllTime).unwrap();
        assert!((got - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_growth_zero_baseline() {
        assert_eq!(growth(&[0.0, 1.0], Horizon::Points(1)), None);
        assert_eq!(growth(&[0.0, 1.0], Horizon::AllTime), None);
    }

    #[test]
    fn test_growth_negative() {
        let got = growth(&[100.0, 90.0], ONE_DAY).unwrap();
        assert!((got + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_growth_summary_horizons() {
        let data: Vec<f64> = (1..=6).map(|i| i as f64 * 10.0).collect();
        let summary = growth_summary(&data);

        assert!((summary.one_day.unwrap() - 20.0).abs() < 1e-9);
        assert!((summary.one_week.unwrap() - 500.0).abs() < 1e-9);
        assert_eq!(summary.one_year, None);
        assert!((summary.all_time.unwrap() - 500.0).abs() < 1e-9);
    }
}
