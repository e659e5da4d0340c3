use crate::scoring::{ScoringPipeline, ScoringPolicy};
use chrono::{DateTime, Utc};
use screener_core::{MarketDataProvider, ScoreResult, ScreenerError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{self, JoinHandle, JoinSet};

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const MAX_CONCURRENCY: usize = 64;

/// Reason recorded on tickers skipped after cancellation.
pub const CANCELLED_REASON: &str = "cancelled";

pub const DEFAULT_TICKERS: &[&str] = &[
    "AAPL", "MSFT", "TSLA", "NVDA", "AMD", "INTC", "F", "NIO", "XOM", "PFE", "KO", "PLTR", "SHOP",
    "SQ", "BYND",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenerEvent {
    /// `completed` of `total` tickers are done.
    Progress { completed: usize, total: usize },
    Finished,
}

impl ScreenerEvent {
    pub fn percent(&self) -> Option<usize> {
        match self {
            ScreenerEvent::Progress { completed, total } if *total > 0 => Some(completed * 100 / total),
            ScreenerEvent::Progress { .. } => Some(100),
            ScreenerEvent::Finished => None,
        }
    }
}

/// Cooperative cancellation flag shared between a run and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerResult {
    /// One entry per input symbol, highest score first.
    pub results: Vec<ScoreResult>,
    /// Distinct sectors of the successfully scored tickers, sorted.
    pub sectors: Vec<String>,
    pub total_analyzed: usize,
    pub total_failed: usize,
    pub cancelled: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct StockScreener {
    provider: Arc<dyn MarketDataProvider>,
    pipeline: Arc<ScoringPipeline>,
    leverage: bool,
    concurrency: usize,
}

impl StockScreener {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            pipeline: Arc::new(ScoringPipeline::default()),
            leverage: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.pipeline = Arc::new(ScoringPipeline::new(policy));
        self
    }

    pub fn with_leverage(mut self, leverage: bool) -> Self {
        self.leverage = leverage;
        self
    }

    /// Maximum tickers in flight, clamped to `1..=MAX_CONCURRENCY`; 1 scores
    /// them strictly in input order.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    pub fn policy(&self) -> ScoringPolicy {
        self.pipeline.policy()
    }

    /// Scores every symbol. Never fails: fetch errors, scoring errors, panics
    /// and cancelled tickers all come back as failure sentinels.
    pub async fn screen(
        &self,
        symbols: &[String],
        events: &mpsc::UnboundedSender<ScreenerEvent>,
        cancel: &CancelToken,
    ) -> ScreenerResult {
        let total = symbols.len();
        tracing::info!(
            "📊 Starting stock screen of {} symbols (policy={}, concurrency={})",
            total,
            self.pipeline.policy(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        // Dropping the set aborts every ticker still in flight
        let mut tasks = JoinSet::new();
        let mut spawned: HashMap<task::Id, (usize, String)> = HashMap::with_capacity(total);

        for (index, symbol) in symbols.iter().enumerate() {
            let job = score_symbol(
                Arc::clone(&self.provider),
                Arc::clone(&self.pipeline),
                symbol.clone(),
                self.leverage,
                Arc::clone(&semaphore),
                cancel.clone(),
            );
            let handle = tasks.spawn(async move { (index, job.await) });
            spawned.insert(handle.id(), (index, symbol.clone()));
        }

        let mut slots: Vec<Option<ScoreResult>> = vec![None; total];
        let mut completed = 0;

        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    let Some((index, symbol)) = spawned.get(&e.id()).cloned() else {
                        tracing::error!("Task error for unknown ticker: {}", e);
                        continue;
                    };
                    tracing::error!("Task error for {}: {}", symbol, e);
                    (index, ScoreResult::failure(&symbol, format!("task failed: {}", e)))
                }
            };
            slots[index] = Some(result);

            completed += 1;
            let _ = events.send(ScreenerEvent::Progress { completed, total });
        }

        let mut results: Vec<ScoreResult> = slots.into_iter().flatten().collect();

        // Sort by score (highest first); stable, so input order breaks ties
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let sectors: Vec<String> = results
            .iter()
            .filter(|r| !r.failed)
            .filter_map(|r| r.sector.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let total_failed = results.iter().filter(|r| r.failed).count();
        let cancelled = cancel.is_cancelled();

        tracing::info!(
            "✅ Screen complete: {}/{} scored, {} failed{}",
            total - total_failed,
            total,
            total_failed,
            if cancelled { " (cancelled)" } else { "" }
        );

        let _ = events.send(ScreenerEvent::Finished);

        ScreenerResult {
            results,
            sectors,
            total_analyzed: total,
            total_failed,
            cancelled,
            timestamp: Utc::now(),
        }
    }

    /// Runs `screen` in the background.
    pub fn spawn(&self, symbols: Vec<String>) -> ScreenerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();
        let screener = self.clone();
        let token = cancel.clone();

        let task = tokio::spawn(async move { screener.screen(&symbols, &tx, &token).await });

        ScreenerHandle {
            events: rx,
            cancel,
            task,
        }
    }
}

async fn score_symbol(
    provider: Arc<dyn MarketDataProvider>,
    pipeline: Arc<ScoringPipeline>,
    symbol: String,
    leverage: bool,
    semaphore: Arc<Semaphore>,
    cancel: CancelToken,
) -> ScoreResult {
    let _permit = semaphore.acquire_owned().await.ok();

    if cancel.is_cancelled() {
        return ScoreResult::failure(&symbol, CANCELLED_REASON);
    }

    let scored = provider
        .fetch(&symbol)
        .await
        .and_then(|data| pipeline.score_ticker(&symbol, &data, leverage));

    match scored {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Failed to analyze {}: {}", symbol, e);
            ScoreResult::failure(&symbol, e.to_string())
        }
    }
}

/// A screener run on a background task. Dropping the handle aborts the run.
pub struct ScreenerHandle {
    /// Progress events, closed once the run is over.
    pub events: mpsc::UnboundedReceiver<ScreenerEvent>,
    cancel: CancelToken,
    task: JoinHandle<ScreenerResult>,
}

impl ScreenerHandle {
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(mut self) -> Result<ScreenerResult, ScreenerError> {
        (&mut self.task)
            .await
            .map_err(|e| ScreenerError::Unknown(format!("screener task failed: {}", e)))
    }
}

impl Drop for ScreenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
