use chrono::{DateTime, Utc};
use reqwest::Client;
use screener_core::{Bar, ScreenerError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub mod provider;


pub use provider::*;

const BASE_URL: &str = "https://api.polygon.io";
const MAX_RETRIES: u32 = 3;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }
            let Some(&oldest) = ts.front() else {
                return;
            };

            // Wait until the oldest request falls out of the window
            let sleep_dur = (oldest + self.window).duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Polygon API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
    retry_wait: Duration,
}

impl PolygonClient {
    /// Creates a client allowing `requests_per_minute` calls. Free tier keys
    /// should use 5.
    pub fn new(api_key: String, requests_per_minute: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            client,
            rate_limiter: RateLimiter::new(requests_per_minute, Duration::from_secs(60)),
            retry_wait: Duration::from_secs(15),
        }
    }

    /// Points the client at another server (mock servers, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_wait(mut self, retry_wait: Duration) -> Self {
        self.retry_wait = retry_wait;
        self
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ScreenerError> {
        let request = builder.build().map_err(|e| ScreenerError::ApiError(e.to_string()))?;

        for attempt in 0..MAX_RETRIES {
            self.rate_limiter.acquire().await;
            let req_clone = request.try_clone()
                .ok_or_else(|| ScreenerError::ApiError("Cannot clone request".to_string()))?;
            let response = self.client.execute(req_clone).await
                .map_err(|e| ScreenerError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            tracing::warn!(
                "Polygon 429 rate limited, waiting {}s before retry {}/{}",
                self.retry_wait.as_secs(),
                attempt + 1,
                MAX_RETRIES
            );
            tokio::time::sleep(self.retry_wait).await;
        }

        Err(ScreenerError::ApiError(format!("Rate limited by Polygon after {} retries", MAX_RETRIES)))
    }

    async fn http_error(response: reqwest::Response) -> ScreenerError {
        ScreenerError::ApiError(format!(
            "HTTP {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        ))
    }

    fn is_unauthorized(response: &reqwest::Response) -> bool {
        matches!(response.status().as_u16(), 401 | 403)
    }

    /// Get aggregates (bars) for a symbol, oldest first
    pub async fn get_aggregates(
        &self,
        symbol: &str,
        multiplier: u32,
        timespan: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, ScreenerError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            self.base_url,
            symbol,
            multiplier,
            timespan,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self.send_request(
            self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "50000"),
            ])
        ).await?;

        if !response.status().is_success() {
            return Err(Self::http_error(response).await);
        }

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| ScreenerError::ApiError(e.to_string()))?;

        agg_response
            .results
            .into_iter()
            .map(|r| {
                let timestamp = DateTime::from_timestamp_millis(r.t).ok_or_else(|| {
                    ScreenerError::InvalidData(format!("bad bar timestamp {} for {}", r.t, symbol))
                })?;
                Ok(Bar {
                    timestamp,
                    open: r.o,
                    high: r.h,
                    low: r.l,
                    close: r.c,
                    volume: r.v,
                })
            })
            .collect()
    }

    /// Get quarterly financials, latest filing first. Plans without access get an empty list.
    pub async fn get_financials(&self, symbol: &str) -> Result<Vec<QuarterlyFinancials>, ScreenerError> {
        let url = format!("{}/vX/reference/financials", self.base_url);

        let response = self.send_request(
            self.client.get(&url).query(&[
                ("ticker", symbol),
                ("timeframe", "quarterly"),
                ("order", "desc"),
                ("sort", "filing_date"),
                ("apiKey", self.api_key.as_str()),
                ("limit", "8"),
            ])
        ).await?;

        if !response.status().is_success() {
            if Self::is_unauthorized(&response) {
                return Ok(Vec::new());
            }
            return Err(Self::http_error(response).await);
        }

        let fin_response: FinancialsResponse = response
            .json()
            .await
            .map_err(|e| ScreenerError::ApiError(e.to_string()))?;

        fn value(statement: &HashMap<String, serde_json::Value>, key: &str) -> Option<f64> {
            statement.get(key).and_then(|v| v.get("value")).and_then(|v| v.as_f64())
        }

        Ok(fin_response
            .results
            .into_iter()
            .map(|r| {
                let income = r.financials.income_statement;
                let balance = r.financials.balance_sheet;

                QuarterlyFinancials {
                    fiscal_period: r.fiscal_period.unwrap_or_default(),
                    fiscal_year: r.fiscal_year.and_then(|y| y.parse().ok()),
                    eps: value(&income, "basic_earnings_per_share")
                        .or_else(|| value(&income, "diluted_earnings_per_share")),
                    total_liabilities: value(&balance, "liabilities"),
                    shareholders_equity: value(&balance, "equity"),
                }
            })
            .collect())
    }

    /// Get ticker details
    pub async fn get_ticker_details(&self, symbol: &str) -> Result<TickerDetails, ScreenerError> {
        let url = format!("{}/v3/reference/tickers/{}", self.base_url, symbol);

        let response = self.send_request(
            self.client.get(&url).query(&[("apiKey", &self.api_key)])
        ).await?;

        if !response.status().is_success() {
            return Err(Self::http_error(response).await);
        }

        let details_response: TickerDetailsResponse = response
            .json()
            .await
            .map_err(|e| ScreenerError::ApiError(e.to_string()))?;

        Ok(details_response.results)
    }

    /// Get dividend history for a symbol, most recent first
    pub async fn get_dividends(&self, symbol: &str, limit: u32) -> Result<Vec<DividendInfo>, ScreenerError> {
        let url = format!("{}/v3/reference/dividends", self.base_url);
        let limit = limit.to_string();

        let response = self.send_request(
            self.client.get(&url).query(&[
                ("ticker", symbol),
                ("apiKey", self.api_key.as_str()),
                ("limit", limit.as_str()),
                ("order", "desc"),
            ])
        ).await?;

        if !response.status().is_success() {
            if Self::is_unauthorized(&response) {
                return Ok(Vec::new());
            }
            return Err(Self::http_error(response).await);
        }

        let div_response: DividendResponse = response
            .json()
            .await
            .map_err(|e| ScreenerError::ApiError(e.to_string()))?;

        Ok(div_response.results)
    }
}

/// Balance sheet and EPS figures from one quarterly filing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyFinancials {
    pub fiscal_period: String,
    pub fiscal_year: Option<i32>,
    pub eps: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub shareholders_equity: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickerDetails {
    pub ticker: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub sic_code: Option<String>,
    #[serde(default)]
    pub sic_description: Option<String>,
    #[serde(default)]
    pub share_class_shares_outstanding: Option<f64>,
    #[serde(default)]
    pub weighted_shares_outstanding: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendInfo {
    pub cash_amount: Option<f64>,
    pub ex_dividend_date: Option<String>,
    pub pay_date: Option<String>,
    pub frequency: Option<i32>,
    #[serde(default)]
    pub dividend_type: Option<String>,
}

// Response structures
#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp
    o: f64, // open
    h: f64, // high
    l: f64, // low
    c: f64, // close
    #[serde(default)]
    v: f64, // volume
}

#[derive(Debug, Deserialize)]
struct FinancialsResponse {
    #[serde(default)]
    results: Vec<FinancialResult>,
}

#[derive(Debug, Deserialize)]
struct FinancialResult {
    #[serde(default)]
    fiscal_period: Option<String>,
    #[serde(default)]
    fiscal_year: Option<String>,
    financials: FinancialStatements,
}

#[derive(Debug, Deserialize)]
struct FinancialStatements {
    #[serde(default)]
    income_statement: HashMap<String, serde_json::Value>,
    #[serde(default)]
    balance_sheet: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TickerDetailsResponse {
    results: TickerDetails,
}

#[derive(Debug, Deserialize)]
struct DividendResponse {
    #[serde(default)]
    results: Vec<DividendInfo>,
}
