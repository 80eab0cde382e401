//! Inputs to the mutating engine operations.
//!
//! Each command carries a correlation id for logs and events, and the
//! mutating ones an optional `expected_version`: the version the caller last
//! read. A stale version fails with `Conflict` before anything is written.

use uuid::Uuid;

use procura_core::domain::actor::ActorToken;
use procura_core::domain::bid::{BidId, BidSubmission};
use procura_core::domain::request::{Decision, NewPurchaseRequest, RequestId};

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Clone, Debug)]
pub struct CreateRequest {
    pub actor: ActorToken,
    pub input: NewPurchaseRequest,
    pub correlation_id: String,
}

impl CreateRequest {
    pub fn new(actor: impl Into<String>, input: NewPurchaseRequest) -> Self {
        Self { actor: ActorToken(actor.into()), input, correlation_id: new_correlation_id() }
    }
}

#[derive(Clone, Debug)]
pub struct SubmitRequest {
    pub request_id: RequestId,
    pub actor: ActorToken,
    pub expected_version: Option<u64>,
    pub correlation_id: String,
}

impl SubmitRequest {
    pub fn new(request_id: RequestId, actor: impl Into<String>) -> Self {
        Self {
            request_id,
            actor: ActorToken(actor.into()),
            expected_version: None,
            correlation_id: new_correlation_id(),
        }
    }

    pub fn expecting(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

#[derive(Clone, Debug)]
pub struct DecideRequest {
    pub request_id: RequestId,
    pub actor: ActorToken,
    pub decision: Decision,
    pub comment: String,
    pub expected_version: Option<u64>,
    pub correlation_id: String,
}

impl DecideRequest {
    pub fn new(
        request_id: RequestId,
        actor: impl Into<String>,
        decision: Decision,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            actor: ActorToken(actor.into()),
            decision,
            comment: comment.into(),
            expected_version: None,
            correlation_id: new_correlation_id(),
        }
    }

    pub fn expecting(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

#[derive(Clone, Debug)]
pub struct SubmitBid {
    pub submission: BidSubmission,
    pub correlation_id: String,
}

impl SubmitBid {
    pub fn new(submission: BidSubmission) -> Self {
        Self { submission, correlation_id: new_correlation_id() }
    }
}

#[derive(Clone, Debug)]
pub struct AwardBid {
    pub request_id: RequestId,
    pub actor: ActorToken,
    pub winning_bid_id: BidId,
    pub expected_version: Option<u64>,
    pub correlation_id: String,
}

impl AwardBid {
    pub fn new(request_id: RequestId, actor: impl Into<String>, winning_bid_id: BidId) -> Self {
        Self {
            request_id,
            actor: ActorToken(actor.into()),
            winning_bid_id,
            expected_version: None,
            correlation_id: new_correlation_id(),
        }
    }

    pub fn expecting(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}
