//! CSV export of screener results.
//!
//! Absent values are written as `-` and signals are joined with `;`, so a
//! file written here can be read back with [`read_csv`]. A failed row's
//! signals column holds the failure reason verbatim and is read back as a
//! single entry. Sectors and industries never hold a bare `-`
//! ([`Fundamentals::sanitized`](screener_core::Fundamentals::sanitized)
//! drops it), so the placeholder is unambiguous.

use screener_core::{GrowthSummary, ScoreResult, ScreenerError, SignalSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

pub const MISSING: &str = "-";

pub const COLUMNS: [&str; 20] = [
    "ticker",
    "score",
    "valuation_score",
    "price",
    "pe",
    "pb",
    "beta",
    "dividend_yield",
    "market_cap",
    "debt_to_equity",
    "rsi",
    "growth_1d",
    "growth_1w",
    "growth_1y",
    "growth_all",
    "sector",
    "industry",
    "signals",
    "recommendation",
    "failed",
];

fn csv_error(e: csv::Error) -> ScreenerError {
    ScreenerError::Export(e.to_string())
}

fn number(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => MISSING.to_string(),
    }
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or(MISSING).to_string()
}

fn row(result: &ScoreResult) -> Vec<String> {
    vec![
        result.ticker.clone(),
        result.score.to_string(),
        number(result.valuation_score),
        number(result.price),
        number(result.pe),
        number(result.pb),
        number(result.beta),
        number(result.dividend_yield),
        number(result.market_cap),
        number(result.debt_to_equity),
        number(result.rsi),
        number(result.growth.one_day),
        number(result.growth.one_week),
        number(result.growth.one_year),
        number(result.growth.all_time),
        text(result.sector.as_deref()),
        text(result.industry.as_deref()),
        result.signals.to_string(),
        result.recommendation.to_string(),
        result.failed.to_string(),
    ]
}

/// Writes a header row and one row per result, in the given order.
pub fn write_csv<W: Write>(results: &[ScoreResult], writer: W) -> Result<(), ScreenerError> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(COLUMNS).map_err(csv_error)?;
    for result in results {
        wtr.write_record(row(result)).map_err(csv_error)?;
    }

    wtr.flush().map_err(|e| ScreenerError::Export(e.to_string()))
}

/// Writes `results` to `path`. An empty result set writes nothing and
/// returns `Ok(false)`.
pub fn export_csv(results: &[ScoreResult], path: impl AsRef<Path>) -> Result<bool, ScreenerError> {
    if results.is_empty() {
        return Ok(false);
    }

    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| ScreenerError::Export(format!("{}: {}", path.display(), e)))?;
    write_csv(results, file)?;

    tracing::info!("Exported {} results to {}", results.len(), path.display());
    Ok(true)
}

fn field<'a>(record: &'a csv::StringRecord, index: usize) -> Result<&'a str, ScreenerError> {
    record.get(index).ok_or_else(|| {
        ScreenerError::InvalidData(format!("missing column '{}'", COLUMNS[index]))
    })
}

fn parse_number(record: &csv::StringRecord, index: usize) -> Result<Option<f64>, ScreenerError> {
    match field(record, index)?.trim() {
        MISSING | "" => Ok(None),
        raw => raw.parse().map(Some).map_err(|_| {
            ScreenerError::InvalidData(format!("bad {} value '{}'", COLUMNS[index], raw))
        }),
    }
}

fn parse_text(record: &csv::StringRecord, index: usize) -> Result<Option<String>, ScreenerError> {
    match field(record, index)? {
        MISSING | "" => Ok(None),
        raw => Ok(Some(raw.to_string())),
    }
}

/// The sentinel's only signal is its failure reason, which may contain `;`.
fn parse_signals(raw: &str, failed: bool) -> SignalSet {
    if !failed {
        return SignalSet::parse_joined(raw);
    }
    std::iter::once(raw).filter(|r| !r.is_empty()).collect()
}

/// Parses a file written by [`write_csv`].
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ScoreResult>, ScreenerError> {
    let mut rdr = csv::Reader::from_reader(reader);

    let headers = rdr.headers().map_err(csv_error)?;
    if headers.iter().ne(COLUMNS) {
        return Err(ScreenerError::InvalidData(format!(
            "unexpected header: {}",
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut results = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_error)?;

        let score = parse_number(&record, 1)?.ok_or_else(|| {
            ScreenerError::InvalidData(format!("missing score for {}", &record[0]))
        })?;
        let failed = field(&record, 19)?.trim().parse::<bool>().map_err(|e| {
            ScreenerError::InvalidData(format!("bad failed flag: {}", e))
        })?;

        results.push(ScoreResult {
            ticker: field(&record, 0)?.to_string(),
            score,
            valuation_score: parse_number(&record, 2)?,
            price: parse_number(&record, 3)?,
            pe: parse_number(&record, 4)?,
            pb: parse_number(&record, 5)?,
            beta: parse_number(&record, 6)?,
            dividend_yield: parse_number(&record, 7)?,
            market_cap: parse_number(&record, 8)?,
            debt_to_equity: parse_number(&record, 9)?,
            rsi: parse_number(&record, 10)?,
            growth: GrowthSummary {
                one_day: parse_number(&record, 11)?,
                one_week: parse_number(&record, 12)?,
                one_year: parse_number(&record, 13)?,
                all_time: parse_number(&record, 14)?,
            },
            sector: parse_text(&record, 15)?,
            industry: parse_text(&record, 16)?,
            signals: parse_signals(field(&record, 17)?, failed),
            recommendation: field(&record, 18)?.parse()?,
            failed,
        });
    }

    Ok(results)
}
