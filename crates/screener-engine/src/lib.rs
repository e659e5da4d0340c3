//! Scoring pipeline and batch screener.
//!
//! [`ScoringPipeline`] turns one ticker's market data into a labeled
//! [`ScoreResult`](screener_core::ScoreResult); [`StockScreener`] runs it over
//! a symbol list with bounded concurrency, progress events and cooperative
//! cancellation.

pub mod export;
pub mod scoring;
pub mod screener;


pub use export::{export_csv, read_csv, write_csv};
pub use scoring::{CompositeScore, CompositeScorer, ScoringPipeline, ScoringPolicy};
pub use screener::{
    CancelToken, ScreenerEvent, ScreenerHandle, ScreenerResult, StockScreener, CANCELLED_REASON,
    DEFAULT_CONCURRENCY, DEFAULT_TICKERS, MAX_CONCURRENCY,
};
