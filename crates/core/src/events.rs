use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::UserId;
use crate::domain::bid::BidId;
use crate::domain::request::RequestId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    RequestSubmitted { request_id: RequestId, approver: Option<UserId> },
    RequestApproved { request_id: RequestId, approver: UserId },
    RequestRejected { request_id: RequestId, approver: UserId, comment: String },
    RequestAwarded { request_id: RequestId, bid_id: BidId },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestSubmitted { .. } => "request.submitted",
            Self::RequestApproved { .. } => "request.approved",
            Self::RequestRejected { .. } => "request.rejected",
            Self::RequestAwarded { .. } => "request.awarded",
        }
    }

    pub fn request_id(&self) -> &RequestId {
        match self {
            Self::RequestSubmitted { request_id, .. }
            | Self::RequestApproved { request_id, .. }
            | Self::RequestRejected { request_id, .. }
            | Self::RequestAwarded { request_id, .. } => request_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: String,
    pub correlation_id: String,
    pub actor: String,
    pub event: DomainEvent,
    pub occurred_at: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new(
        event: DomainEvent,
        correlation_id: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            correlation_id: correlation_id.into(),
            actor: actor.into(),
            event,
            occurred_at: Utc::now(),
        }
    }

    pub fn payload_json(&self) -> String {
        serde_json::to_string(&self.event).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Fire-and-forget outlet for downstream notification and export. The
/// engine emits only after the corresponding write has committed and never
/// waits on, or fails because of, a sink.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EventEnvelope);
}

#[derive(Clone, Default)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<Vec<EventEnvelope>>>,
}

impl InMemoryEventSink {
    pub fn events(&self) -> Vec<EventEnvelope> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|envelope| envelope.event.name()).collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn emit(&self, event: EventEnvelope) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
