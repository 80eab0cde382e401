use serde::{Deserialize, Serialize};

use crate::domain::bid::Bid;

/// Weights for scoring components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Weight for the normalized price score (default: 0.50)
    pub price: f64,
    /// Weight for the normalized delivery score (default: 0.30)
    pub delivery: f64,
    /// Weight for the supplier reputation score (default: 0.20)
    pub reputation: f64,
    /// Largest deduction applied to a bid that exceeds the request budget
    /// (default: 0.20, reached at 100% overrun)
    pub over_budget_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        super::DEFAULT_WEIGHTS
    }
}

impl ScoringWeights {
    pub fn component_sum(&self) -> f64 {
        self.price + self.delivery + self.reputation
    }
}

/// Per-component scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentScores {
    pub price: f64,
    pub delivery: f64,
    pub reputation: f64,
    /// Already weighted; subtracted from the composite.
    pub over_budget_penalty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BidScore {
    pub components: ComponentScores,
    pub composite: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedBid {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub bid: Bid,
    pub score: BidScore,
}
