use screener_core::ScoreResult;

const MISSING: &str = "-";

pub const HEADERS: [&str; 18] = [
    "Ticker",
    "Score",
    "Valuation",
    "Price",
    "PE",
    "PB",
    "Beta",
    "DivYield %",
    "Debt/Equity",
    "Market Cap (B)",
    "RSI",
    "1D %",
    "1W %",
    "1Y %",
    "AllTime %",
    "Sector",
    "Industry",
    "Recommendation",
];

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Score and growth columns, coloured by sign.
const SIGNED_COLUMNS: [usize; 5] = [1, 11, 12, 13, 14];

fn paint(padded: String, value: Option<f64>) -> String {
    match value {
        Some(v) if v > 0.0 => format!("{}{}{}", GREEN, padded, RESET),
        Some(v) if v < 0.0 => format!("{}{}{}", RED, padded, RESET),
        _ => padded,
    }
}

fn signed_value(result: &ScoreResult, column: usize) -> Option<f64> {
    match column {
        1 => Some(result.score),
        11 => result.growth.one_day,
        12 => result.growth.one_week,
        13 => result.growth.one_year,
        14 => result.growth.all_time,
        _ => None,
    }
}

fn fixed(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => MISSING.to_string(),
    }
}

fn cells(result: &ScoreResult) -> Vec<String> {
    vec![
        result.ticker.clone(),
        format!("{:.2}", result.score),
        fixed(result.valuation_score, 1),
        fixed(result.price, 2),
        fixed(result.pe, 2),
        fixed(result.pb, 2),
        fixed(result.beta, 2),
        fixed(result.dividend_yield.map(|y| y * 100.0), 2),
        fixed(result.debt_to_equity, 1),
        fixed(result.market_cap.map(|c| c / 1e9), 2),
        fixed(result.rsi, 1),
        fixed(result.growth.one_day, 2),
        fixed(result.growth.one_week, 2),
        fixed(result.growth.one_year, 2),
        fixed(result.growth.all_time, 1),
        result.sector.clone().unwrap_or_else(|| MISSING.to_string()),
        result.industry.clone().unwrap_or_else(|| MISSING.to_string()),
        match result.failure_reason() {
            Some(reason) => format!("{} ({})", result.recommendation, reason),
            None => result.recommendation.to_string(),
        },
    ]
}

/// Renders results as a left-aligned text table, one line per result. With
/// `colored`, positive scores and growth are green and negative ones red;
/// escape codes wrap padded cells so columns stay aligned.
pub fn render_table(results: &[&ScoreResult], colored: bool) -> String {
    let rows: Vec<Vec<String>> = results.iter().map(|r| cells(r)).collect();

    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>, source: Option<&ScoreResult>| -> String {
        cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(column, (cell, width))| {
                let padded = format!("{:<width$}", cell, width = *width);
                match source {
                    Some(result) if colored && SIGNED_COLUMNS.contains(&column) => {
                        paint(padded, signed_value(result, column))
                    }
                    _ => padded,
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(line(HEADERS.to_vec(), None));
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for (row, result) in rows.iter().zip(results) {
        out.push(line(row.iter().map(String::as_str).collect(), Some(*result)));
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use screener_core::{GrowthSummary, Recommendation, SignalSet};

    fn sample() -> ScoreResult {
        ScoreResult {
            ticker: "PFE".to_string(),
            score: 1.5,
            valuation_score: Some(3.0),
            price: Some(28.457),
            pe: None,
            pb: Some(1.7),
            beta: Some(0.6),
            dividend_yield: Some(0.0589),
            market_cap: Some(161.2e9),
            debt_to_equity: Some(73.24),
            sector: Some("Manufacturing".to_string()),
            industry: None,
            rsi: Some(44.44),
            growth: GrowthSummary {
                one_day: Some(0.5),
                one_week: None,
                one_year: Some(-12.347),
                all_time: Some(300.0),
            },
            signals: SignalSet::new(),
            recommendation: Recommendation::from_score(1.5, false),
            failed: false,
        }
    }

    #[test]
    fn test_cells_format_units() {
        let c = cells(&sample());
        assert_eq!(c.len(), HEADERS.len());
        assert_eq!(c[1], "1.50");
        assert_eq!(c[3], "28.46");
        assert_eq!(c[4], "-");
        assert_eq!(c[7], "5.89");
        assert_eq!(c[8], "73.2");
        assert_eq!(c[9], "161.20");
        assert_eq!(c[12], "-");
        assert_eq!(c[13], "-12.35");
        assert_eq!(c[16], "-");
        assert_eq!(c[17], "Buy / Hold");
    }

    #[test]
    fn test_failed_row_shows_reason() {
        let failed = ScoreResult::failure("BYND", "Insufficient data: no price history for BYND");
        let c = cells(&failed);
        assert_eq!(c[1], "-99.00");
        assert_eq!(c[17], "Avoid / Risky (Insufficient data: no price history for BYND)");
    }

    #[test]
    fn test_table_aligns_columns() {
        let a = sample();
        let mut b = sample();
        b.ticker = "GOOGL".to_string();

        let table = render_table(&[&a, &b], false);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Ticker  Score"));
        assert!(lines[1].starts_with("------"));
        let score_col = lines[0].find("Score").unwrap();
        assert_eq!(lines[2].find("1.50"), Some(score_col));
        assert_eq!(lines[3].find("1.50"), Some(score_col));
    }

    #[test]
    fn test_empty_table_has_header() {
        let table = render_table(&[], true);
        assert_eq!(table.lines().count(), 2);
        assert!(!table.contains('\x1b'));
    }

    #[test]
    fn test_colored_table_paints_by_sign() {
        let up = sample();
        let failed = ScoreResult::failure("BYND", "no data");

        let plain = render_table(&[&up, &failed], false);
        assert!(!plain.contains('\x1b'));

        let table = render_table(&[&up, &failed], true);
        let lines: Vec<&str> = table.lines().collect();
        assert!(!lines[0].contains('\x1b'));

        assert!(lines[2].contains(&format!("{}1.50", GREEN)));
        assert!(lines[2].contains(&format!("{}-12.35", RED)));
        assert!(lines[2].contains(&format!("{}0.50", GREEN)));
        assert!(lines[3].contains(&format!("{}-99.00", RED)));

        let strip = |s: &str| s.replace(GREEN, "").replace(RED, "").replace(RESET, "");
        for (painted, bare) in table.lines().zip(plain.lines()) {
            assert_eq!(strip(painted), bare);
        }
    }
}
