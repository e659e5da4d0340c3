use async_trait::async_trait;
use crate::{MarketData, ScreenerError};

/// Source of price history and fundamentals for a ticker symbol.
///
/// Implementations may fail for unknown symbols, network errors or empty
/// history. The batch runner turns any failure into a sentinel result, so
/// providers should not retry on their own beyond transport-level concerns.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Result<MarketData, ScreenerError>;
}
