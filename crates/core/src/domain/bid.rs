use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::request::RequestId;
use crate::domain::supplier::SupplierId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BidId(pub String);

impl std::fmt::Display for BidId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Submitted,
    Selected,
    Rejected,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Selected => "selected",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submitted" => Some(Self::Submitted),
            "selected" => Some(Self::Selected),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidSubmission {
    pub request_id: RequestId,
    pub supplier_id: SupplierId,
    pub bid_amount: Decimal,
    pub delivery_time_days: u32,
    pub proposal: String,
}

impl BidSubmission {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.bid_amount <= Decimal::ZERO {
            return Err(DomainError::Validation(format!(
                "bid amount must be positive, got {}",
                self.bid_amount
            )));
        }
        if self.delivery_time_days < 1 {
            return Err(DomainError::Validation(
                "delivery time must be at least one day".to_string(),
            ));
        }
        if self.proposal.trim().is_empty() {
            return Err(DomainError::Validation("proposal must not be empty".to_string()));
        }
        Ok(())
    }
}

/// A supplier's offer against one purchase request. Everything except
/// `status` is fixed at creation; `status` is finalized once, by an award.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub request_id: RequestId,
    pub supplier_id: SupplierId,
    pub bid_amount: Decimal,
    pub delivery_time_days: u32,
    pub proposal: String,
    pub status: BidStatus,
    pub submitted_at: DateTime<Utc>,
}

impl Bid {
    pub fn from_submission(id: BidId, submission: BidSubmission, now: DateTime<Utc>) -> Self {
        Self {
            id,
            request_id: submission.request_id,
            supplier_id: submission.supplier_id,
            bid_amount: submission.bid_amount,
            delivery_time_days: submission.delivery_time_days,
            proposal: submission.proposal,
            status: BidStatus::Submitted,
            submitted_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == BidStatus::Submitted
    }
}
