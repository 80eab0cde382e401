use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::actor::UserId;
use crate::errors::DomainError;
use crate::lifecycle::{self, LifecycleAction, TransitionOutcome};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Ordered,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Ordered => "ordered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "ordered" => Some(Self::Ordered),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Ordered)
    }

    /// Bids are only accepted while the request sits in `approved`.
    pub fn accepts_bids(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Some(Self::Approve),
            "reject" | "rejected" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn action(&self) -> LifecycleAction {
        match self {
            Self::Approve => LifecycleAction::Approve,
            Self::Reject => LifecycleAction::Reject,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub approver: UserId,
    pub decision: Decision,
    pub comment: String,
    pub decided_at: DateTime<Utc>,
}

/// Input for a new draft request. Identity, status and version are assigned
/// by the lifecycle controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchaseRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub quantity: u32,
    pub budget: Decimal,
    pub urgency: Urgency,
    pub department: String,
}

impl NewPurchaseRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::Validation("title must not be empty".to_string()));
        }
        if self.category.trim().is_empty() {
            return Err(DomainError::Validation("category must not be empty".to_string()));
        }
        if self.department.trim().is_empty() {
            return Err(DomainError::Validation("department must not be empty".to_string()));
        }
        if self.quantity == 0 {
            return Err(DomainError::Validation("quantity must be at least 1".to_string()));
        }
        if self.budget <= Decimal::ZERO {
            return Err(DomainError::Validation(format!(
                "budget must be a positive amount, got {}",
                self.budget
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: RequestId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub quantity: u32,
    pub budget: Decimal,
    pub urgency: Urgency,
    pub department: String,
    pub requested_by: UserId,
    pub current_approver: Option<UserId>,
    pub status: RequestStatus,
    pub approval_history: Vec<ApprovalRecord>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseRequest {
    pub fn draft(
        id: RequestId,
        requested_by: UserId,
        input: NewPurchaseRequest,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: input.title,
            description: input.description,
            category: input.category,
            quantity: input.quantity,
            budget: input.budget,
            urgency: input.urgency,
            department: input.department,
            requested_by,
            current_approver: None,
            status: RequestStatus::Draft,
            approval_history: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_apply(&self, action: LifecycleAction) -> bool {
        lifecycle::next_status(self.status, action).is_ok()
    }

    /// Moves the request along one edge of the lifecycle graph. The version
    /// stamp is left alone; the ledger store bumps it on a successful write.
    pub fn apply(
        &mut self,
        action: LifecycleAction,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, DomainError> {
        let to = lifecycle::next_status(self.status, action)
            .map_err(|_| DomainError::InvalidTransition { from: self.status, action })?;
        let outcome = TransitionOutcome { from: self.status, to, action };
        self.status = to;
        self.updated_at = now;
        Ok(outcome)
    }

    pub fn record_decision(
        &mut self,
        approver: UserId,
        decision: Decision,
        comment: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, DomainError> {
        let outcome = self.apply(decision.action(), now)?;
        self.approval_history.push(ApprovalRecord {
            approver,
            decision,
            comment: comment.into(),
            decided_at: now,
        });
        Ok(outcome)
    }
}
