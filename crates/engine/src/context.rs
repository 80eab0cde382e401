use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use procura_core::authz::CapabilityPolicy;
use procura_core::directory::{
    ApproverDirectory, DirectoryError, IdentityProvider, SupplierDirectory,
};
use procura_core::domain::actor::{Actor, ActorToken};
use procura_core::errors::{ApplicationError, DomainError};
use procura_core::events::{DomainEvent, EventEnvelope, EventSink};
use procura_db::LedgerStore;

use crate::guard::LedgerGuard;

/// Everything the engine components share: the ledger, the external
/// collaborators and the authorization policy.
#[derive(Clone)]
pub struct EngineContext {
    pub ledger: Arc<dyn LedgerStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub suppliers: Arc<dyn SupplierDirectory>,
    pub approvers: Arc<dyn ApproverDirectory>,
    pub events: Arc<dyn EventSink>,
    pub policy: CapabilityPolicy,
    pub guard: LedgerGuard,
}

impl EngineContext {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        identity: Arc<dyn IdentityProvider>,
        suppliers: Arc<dyn SupplierDirectory>,
        approvers: Arc<dyn ApproverDirectory>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            ledger,
            identity,
            suppliers,
            approvers,
            events,
            policy: CapabilityPolicy::default(),
            guard: LedgerGuard::default(),
        }
    }

    pub fn with_policy(mut self, policy: CapabilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_ledger_timeout(mut self, timeout: Duration) -> Self {
        self.guard = LedgerGuard::new(timeout);
        self
    }

    /// Unknown tokens are refused outright.
    pub async fn resolve_actor(&self, token: &ActorToken) -> Result<Actor, ApplicationError> {
        let actor = self.identity.resolve(token).await.map_err(integration_error)?;
        actor.ok_or_else(|| DomainError::Forbidden("actor token is not recognised".to_string()).into())
    }

    /// Hands an event to the sink. Only call once the write it describes
    /// has committed.
    pub fn publish(&self, event: DomainEvent, correlation_id: &str, actor: &Actor) {
        debug!(
            event_name = "procurement.event.dispatch",
            correlation_id,
            request_id = %event.request_id(),
            domain_event = event.name(),
            "dispatching domain event"
        );
        self.events.emit(EventEnvelope::new(event, correlation_id, actor.user_id.0.clone()));
    }
}

pub(crate) fn integration_error(error: DirectoryError) -> ApplicationError {
    ApplicationError::Integration(error.to_string())
}
