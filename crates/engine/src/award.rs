use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use procura_core::authz::Capability;
use procura_core::domain::actor::Actor;
use procura_core::domain::bid::{Bid, BidId, BidStatus};
use procura_core::domain::request::{PurchaseRequest, RequestStatus};
use procura_core::errors::{ApplicationError, DomainError, EntityKind};
use procura_core::events::DomainEvent;
use procura_core::lifecycle::LifecycleAction;
use procura_db::{AwardCommit, RepositoryError};

use crate::commands::AwardBid;
use crate::context::EngineContext;
use crate::guard::map_repository_error;
use crate::lifecycle::{check_expected_version, log_rejection, LifecycleController};

/// Commits exactly one winning bid per request. The request move to
/// `ordered` and every bid status change land in one ledger transaction.
#[derive(Clone)]
pub struct AwardCoordinator {
    ctx: Arc<EngineContext>,
    lifecycle: LifecycleController,
}

impl AwardCoordinator {
    pub fn new(ctx: Arc<EngineContext>, lifecycle: LifecycleController) -> Self {
        Self { ctx, lifecycle }
    }

    /// A `Timeout` here is ambiguous: the commit keeps running in the
    /// background and still publishes `RequestAwarded` if it lands, so the
    /// caller must re-read the request before retrying.
    pub async fn award(&self, command: AwardBid) -> Result<PurchaseRequest, ApplicationError> {
        let result = self.try_award(&command).await;
        if let Err(error) = &result {
            log_rejection("award", &command.correlation_id, Some(&command.request_id), error);
        }
        result
    }

    async fn try_award(&self, command: &AwardBid) -> Result<PurchaseRequest, ApplicationError> {
        let actor = self.ctx.resolve_actor(&command.actor).await?;
        let request = self.lifecycle.get_request(&command.request_id).await?;

        self.ctx.policy.require(&actor, Capability::Award, Some(&request.department))?;
        if !request.can_apply(LifecycleAction::Award) {
            return Err(invalid_award(request.status));
        }
        check_expected_version(&request, command.expected_version)?;

        let bid = self.load_candidate(command, &request).await?;
        if bid.status != BidStatus::Submitted {
            return Err(invalid_award(request.status));
        }

        let commit = AwardCommit {
            request_id: request.id.clone(),
            winning_bid_id: bid.id,
            expected_version: request.version,
            awarded_at: Utc::now(),
        };
        // Spawned so that a deadline abandons the wait, never the commit or
        // the event that follows it.
        let winning_bid_id = commit.winning_bid_id.clone();
        let ctx = self.ctx.clone();
        let correlation_id = command.correlation_id.clone();
        let commit_task = tokio::spawn(async move {
            let outcome = ctx.ledger.commit_award(commit).await;
            if let Ok(stored) = &outcome {
                announce_award(&ctx, stored, winning_bid_id, &correlation_id, &actor);
            }
            outcome
        });
        let committed = self.ctx.guard.deadline("commit_award", commit_task).await?.map_err(
            |error| ApplicationError::Persistence(format!("award commit task failed: {error}")),
        )?;

        match committed {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::StatusMismatch { status, .. }) => Err(invalid_award(status)),
            Err(RepositoryError::BidClosed { .. }) => Err(invalid_award(request.status)),
            Err(other) => Err(map_repository_error(other)),
        }
    }

    async fn load_candidate(
        &self,
        command: &AwardBid,
        request: &PurchaseRequest,
    ) -> Result<Bid, ApplicationError> {
        let ledger = &self.ctx.ledger;
        let bid = self.ctx.guard.call("find_bid", ledger.find_bid(&command.winning_bid_id)).await?;
        match bid {
            Some(bid) if bid.request_id == request.id => Ok(bid),
            _ => Err(DomainError::not_found(EntityKind::Bid, command.winning_bid_id.0.clone()).into()),
        }
    }
}

fn announce_award(
    ctx: &EngineContext,
    request: &PurchaseRequest,
    bid_id: BidId,
    correlation_id: &str,
    actor: &Actor,
) {
    info!(
        event_name = "procurement.request.awarded",
        correlation_id,
        request_id = %request.id,
        bid_id = %bid_id,
        awarded_by = %actor.user_id,
        version = request.version,
        "winning bid committed"
    );
    ctx.publish(
        DomainEvent::RequestAwarded { request_id: request.id.clone(), bid_id },
        correlation_id,
        actor,
    );
}

fn invalid_award(from: RequestStatus) -> ApplicationError {
    DomainError::InvalidTransition { from, action: LifecycleAction::Award }.into()
}
