use std::sync::Arc;

use procura_core::config::ScoringConfig;
use procura_core::domain::bid::Bid;
use procura_core::domain::request::{PurchaseRequest, RequestId};
use procura_core::errors::ApplicationError;
use procura_core::scoring::{BidScorer, RankedBid, DEFAULT_TOP_K};

use crate::award::AwardCoordinator;
use crate::commands::{AwardBid, CreateRequest, DecideRequest, SubmitBid, SubmitRequest};
use crate::context::EngineContext;
use crate::intake::BidIntake;
use crate::lifecycle::LifecycleController;
use crate::ranking::BidRanking;

/// The operations the procurement core offers its embedding application.
#[derive(Clone)]
pub struct ProcurementEngine {
    lifecycle: LifecycleController,
    intake: BidIntake,
    ranking: BidRanking,
    award: AwardCoordinator,
}

impl ProcurementEngine {
    /// Engine with the default 50/30/20 scoring split.
    pub fn new(ctx: EngineContext) -> Self {
        Self::with_scorer(ctx, BidScorer::default(), DEFAULT_TOP_K)
    }

    pub fn from_config(ctx: EngineContext, scoring: &ScoringConfig) -> Self {
        Self::with_scorer(ctx, BidScorer::with_weights(scoring.weights), scoring.default_top_k)
    }

    pub fn with_scorer(ctx: EngineContext, scorer: BidScorer, default_top_k: usize) -> Self {
        let ctx = Arc::new(ctx);
        let lifecycle = LifecycleController::new(ctx.clone());
        Self {
            intake: BidIntake::new(ctx.clone(), lifecycle.clone()),
            ranking: BidRanking::new(ctx.clone(), lifecycle.clone(), scorer, default_top_k),
            award: AwardCoordinator::new(ctx, lifecycle.clone()),
            lifecycle,
        }
    }

    pub async fn create_request(
        &self,
        command: CreateRequest,
    ) -> Result<PurchaseRequest, ApplicationError> {
        self.lifecycle.create_request(command).await
    }

    pub async fn get_request(&self, id: &RequestId) -> Result<PurchaseRequest, ApplicationError> {
        self.lifecycle.get_request(id).await
    }

    pub async fn list_bids(&self, id: &RequestId) -> Result<Vec<Bid>, ApplicationError> {
        self.lifecycle.list_bids(id).await
    }

    pub async fn submit(&self, command: SubmitRequest) -> Result<PurchaseRequest, ApplicationError> {
        self.lifecycle.submit(command).await
    }

    pub async fn decide(&self, command: DecideRequest) -> Result<PurchaseRequest, ApplicationError> {
        self.lifecycle.decide(command).await
    }

    pub async fn submit_bid(&self, command: SubmitBid) -> Result<Bid, ApplicationError> {
        self.intake.submit_bid(command).await
    }

    pub async fn rank_bids(
        &self,
        request_id: &RequestId,
        k: Option<usize>,
    ) -> Result<Vec<RankedBid>, ApplicationError> {
        self.ranking.rank_bids(request_id, k).await
    }

    pub async fn award(&self, command: AwardBid) -> Result<PurchaseRequest, ApplicationError> {
        self.award.award(command).await
    }
}
