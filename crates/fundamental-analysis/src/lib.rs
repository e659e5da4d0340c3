use screener_core::Fundamentals;
use serde::{Deserialize, Serialize};

pub const LOW_PE: f64 = 15.0;
pub const LOW_PB: f64 = 3.0;
pub const HIGH_DIVIDEND_YIELD: f64 = 0.02;
pub const LOW_BETA: f64 = 1.2;
pub const LOW_DEBT_TO_EQUITY: f64 = 100.0;

/// Valuation rules that can contribute to the sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuationRule {
    LowPe,
    LowPriceToBook,
    DividendYield,
    LowBeta,
    LowDebt,
}

impl ValuationRule {
    pub fn weight(&self) -> f64 {
        match self {
            ValuationRule::LowBeta => 0.5,
            _ => 1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValuationRule::LowPe => "Low P/E Ratio",
            ValuationRule::LowPriceToBook => "Low Price/Book",
            ValuationRule::DividendYield => "Dividend Yield",
            ValuationRule::LowBeta => "Low Beta",
            ValuationRule::LowDebt => "Low Debt",
        }
    }
}

/// Fundamental sub-score and the rules that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationScore {
    pub score: f64,
    pub fired: Vec<ValuationRule>,
}

impl ValuationScore {
    /// Maximum attainable sub-score when every rule fires.
    pub const MAX: f64 = 4.5;

    fn add(&mut self, rule: ValuationRule) {
        self.score += rule.weight();
        self.fired.push(rule);
    }
}

pub struct FundamentalAnalysisEngine;

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Scores a fundamentals record. Each rule is independent and only fires
    /// when its field is present, so a missing field is never a penalty and a
    /// present zero is a real value.
    pub fn score(&self, fundamentals: &Fundamentals) -> ValuationScore {
        let f = fundamentals.clone().sanitized();
        let mut result = ValuationScore::default();

        if matches!(f.pe(), Some(pe) if pe < LOW_PE) {
            result.add(ValuationRule::LowPe);
        }

        if matches!(f.price_to_book, Some(pb) if pb < LOW_PB) {
            result.add(ValuationRule::LowPriceToBook);
        }

        if matches!(f.dividend_yield, Some(y) if y > HIGH_DIVIDEND_YIELD) {
            result.add(ValuationRule::DividendYield);
        }

        if matches!(f.beta, Some(beta) if beta < LOW_BETA) {
            result.add(ValuationRule::LowBeta);
        }

        if matches!(f.debt_to_equity, Some(de) if de < LOW_DEBT_TO_EQUITY) {
            result.add(ValuationRule::LowDebt);
        }

        result
    }
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}
