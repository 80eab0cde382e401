//! Bid scoring and ranking
//!
//! Ranks competing bids for one purchase request by a weighted blend of
//! price, delivery time and supplier reputation. Price and delivery are
//! normalized against the bid set itself, so a score only has meaning
//! relative to the other bids it was ranked with.

mod scorer;
mod types;

pub use scorer::BidScorer;
pub use types::*;

/// Default scoring weights: 50% price, 30% delivery, 20% reputation.
pub const DEFAULT_WEIGHTS: ScoringWeights = ScoringWeights {
    price: 0.50,
    delivery: 0.30,
    reputation: 0.20,
    over_budget_penalty: 0.20,
};

/// Reputation assumed for suppliers without a rating.
pub const NEUTRAL_REPUTATION: f64 = 0.5;

/// Highest supplier rating on the directory's star scale.
pub const MAX_SUPPLIER_RATING: f64 = 5.0;

/// Number of recommendations returned when the caller does not ask for more.
pub const DEFAULT_TOP_K: usize = 5;
