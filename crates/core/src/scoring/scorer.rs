//! Composite bid scoring

use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::types::*;
use super::{DEFAULT_TOP_K, MAX_SUPPLIER_RATING, NEUTRAL_REPUTATION};
use crate::domain::bid::Bid;
use crate::domain::request::PurchaseRequest;
use crate::domain::supplier::{SupplierId, SupplierProfile};

/// Pure, deterministic bid ranker. Holds nothing but its weights, so one
/// instance can be shared freely across threads.
#[derive(Debug, Clone)]
pub struct BidScorer {
    weights: ScoringWeights,
}

/// Min/max of the bid set, used to normalize price and delivery.
struct BidSetBounds {
    min_amount: Decimal,
    max_amount: Decimal,
    min_days: u32,
    max_days: u32,
}

impl BidSetBounds {
    fn of(bids: &[Bid]) -> Option<Self> {
        let first = bids.first()?;
        let mut bounds = Self {
            min_amount: first.bid_amount,
            max_amount: first.bid_amount,
            min_days: first.delivery_time_days,
            max_days: first.delivery_time_days,
        };
        for bid in &bids[1..] {
            bounds.min_amount = bounds.min_amount.min(bid.bid_amount);
            bounds.max_amount = bounds.max_amount.max(bid.bid_amount);
            bounds.min_days = bounds.min_days.min(bid.delivery_time_days);
            bounds.max_days = bounds.max_days.max(bid.delivery_time_days);
        }
        Some(bounds)
    }
}

impl BidScorer {
    /// Create a scorer with default weights
    pub fn new() -> Self {
        Self { weights: ScoringWeights::default() }
    }

    /// Create with custom weights
    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Ranks every bid, best first. Suppliers missing from `suppliers` are
    /// scored with a neutral reputation.
    pub fn rank(
        &self,
        request: &PurchaseRequest,
        bids: &[Bid],
        suppliers: &HashMap<SupplierId, SupplierProfile>,
    ) -> Vec<RankedBid> {
        let Some(bounds) = BidSetBounds::of(bids) else {
            return Vec::new();
        };

        let mut scored: Vec<(Bid, BidScore)> = bids
            .iter()
            .map(|bid| {
                let rating = suppliers.get(&bid.supplier_id).and_then(|supplier| supplier.rating);
                (bid.clone(), self.score_bid(request, bid, &bounds, rating))
            })
            .collect();

        scored.sort_by(|(a_bid, a_score), (b_bid, b_score)| {
            compare_ranked(a_bid, a_score, b_bid, b_score)
        });

        scored
            .into_iter()
            .enumerate()
            .map(|(index, (bid, score))| RankedBid { rank: index + 1, bid, score })
            .collect()
    }

    /// The first `k` entries of [`BidScorer::rank`]; all of them when fewer exist.
    pub fn top_k(
        &self,
        request: &PurchaseRequest,
        bids: &[Bid],
        suppliers: &HashMap<SupplierId, SupplierProfile>,
        k: usize,
    ) -> Vec<RankedBid> {
        let mut ranked = self.rank(request, bids, suppliers);
        ranked.truncate(k);
        ranked
    }

    /// [`BidScorer::top_k`] with the default recommendation count.
    pub fn recommended(
        &self,
        request: &PurchaseRequest,
        bids: &[Bid],
        suppliers: &HashMap<SupplierId, SupplierProfile>,
    ) -> Vec<RankedBid> {
        self.top_k(request, bids, suppliers, DEFAULT_TOP_K)
    }

    fn score_bid(
        &self,
        request: &PurchaseRequest,
        bid: &Bid,
        bounds: &BidSetBounds,
        rating: Option<f64>,
    ) -> BidScore {
        let components = ComponentScores {
            price: price_score(bid.bid_amount, bounds.min_amount, bounds.max_amount),
            delivery: delivery_score(bid.delivery_time_days, bounds.min_days, bounds.max_days),
            reputation: reputation_score(rating),
            over_budget_penalty: self.over_budget_penalty(bid.bid_amount, request.budget),
        };

        let composite = components.price * self.weights.price
            + components.delivery * self.weights.delivery
            + components.reputation * self.weights.reputation
            - components.over_budget_penalty;

        BidScore { components, composite: composite.max(0.0) }
    }

    fn over_budget_penalty(&self, amount: Decimal, budget: Decimal) -> f64 {
        if budget <= Decimal::ZERO || amount <= budget {
            return 0.0;
        }
        // An overflowing ratio is far past a 100% overrun, so it caps too.
        let overrun = (amount - budget)
            .checked_div(budget)
            .map_or(Decimal::ONE, |ratio| ratio.min(Decimal::ONE));
        overrun.to_f64().unwrap_or(1.0) * self.weights.over_budget_penalty
    }
}

impl Default for BidScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower amount scores higher. The spread is floored at one currency unit so
/// near-identical bids are not blown apart by a tiny denominator.
fn price_score(amount: Decimal, min: Decimal, max: Decimal) -> f64 {
    let spread = (max - min).max(Decimal::ONE);
    let ratio = ((amount - min) / spread).clamp(Decimal::ZERO, Decimal::ONE);
    (Decimal::ONE - ratio).to_f64().unwrap_or(0.0)
}

fn delivery_score(days: u32, min: u32, max: u32) -> f64 {
    let spread = f64::from(max.saturating_sub(min).max(1));
    let ratio = (f64::from(days.saturating_sub(min)) / spread).clamp(0.0, 1.0);
    1.0 - ratio
}

fn reputation_score(rating: Option<f64>) -> f64 {
    rating
        .filter(|rating| rating.is_finite())
        .map(|rating| (rating / MAX_SUPPLIER_RATING).clamp(0.0, 1.0))
        .unwrap_or(NEUTRAL_REPUTATION)
}

/// Score descending, then earlier submission, then lower amount, then bid id.
fn compare_ranked(a_bid: &Bid, a_score: &BidScore, b_bid: &Bid, b_score: &BidScore) -> Ordering {
    b_score
        .composite
        .total_cmp(&a_score.composite)
        .then_with(|| a_bid.submitted_at.cmp(&b_bid.submitted_at))
        .then_with(|| a_bid.bid_amount.cmp(&b_bid.bid_amount))
        .then_with(|| a_bid.id.cmp(&b_bid.id))
}
