use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use procura_core::authz::Capability;
use procura_core::domain::actor::Actor;
use procura_core::domain::bid::Bid;
use procura_core::domain::request::{Decision, PurchaseRequest, RequestId};
use procura_core::errors::{ApplicationError, DomainError, EntityKind};
use procura_core::events::DomainEvent;
use procura_core::lifecycle::LifecycleAction;

use crate::commands::{CreateRequest, DecideRequest, SubmitRequest};
use crate::context::{integration_error, EngineContext};

/// Owns the request state machine: creation, submission and the approval
/// decision. Every status change goes through here or the award coordinator.
#[derive(Clone)]
pub struct LifecycleController {
    ctx: Arc<EngineContext>,
}

impl LifecycleController {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Fresh read of a request from the ledger; never cached.
    pub async fn get_request(&self, id: &RequestId) -> Result<PurchaseRequest, ApplicationError> {
        let ledger = &self.ctx.ledger;
        self.ctx
            .guard
            .call("find_request", ledger.find_request(id))
            .await?
            .ok_or_else(|| DomainError::not_found(EntityKind::Request, id.0.clone()).into())
    }

    pub async fn list_bids(&self, id: &RequestId) -> Result<Vec<Bid>, ApplicationError> {
        self.get_request(id).await?;
        let ledger = &self.ctx.ledger;
        self.ctx.guard.call("list_bids_for_request", ledger.list_bids_for_request(id)).await
    }

    pub async fn create_request(
        &self,
        command: CreateRequest,
    ) -> Result<PurchaseRequest, ApplicationError> {
        let result = self.try_create(&command).await;
        match &result {
            Ok(request) => info!(
                event_name = "procurement.request.created",
                correlation_id = %command.correlation_id,
                request_id = %request.id,
                department = %request.department,
                "purchase request created in draft"
            ),
            Err(error) => log_rejection("create", &command.correlation_id, None, error),
        }
        result
    }

    async fn try_create(&self, command: &CreateRequest) -> Result<PurchaseRequest, ApplicationError> {
        let actor = self.ctx.resolve_actor(&command.actor).await?;
        self.ctx.policy.require(&actor, Capability::Submit, None)?;
        command.input.validate()?;

        let request = PurchaseRequest::draft(
            RequestId(format!("PR-{}", Uuid::new_v4().simple())),
            actor.user_id,
            command.input.clone(),
            Utc::now(),
        );
        let ledger = &self.ctx.ledger;
        self.ctx.guard.call("insert_request", ledger.insert_request(request.clone())).await?;
        Ok(request)
    }

    pub async fn submit(&self, command: SubmitRequest) -> Result<PurchaseRequest, ApplicationError> {
        let result = self.try_submit(&command).await;
        match &result {
            Ok((request, actor)) => {
                info!(
                    event_name = "procurement.request.submitted",
                    correlation_id = %command.correlation_id,
                    request_id = %request.id,
                    approver = request.current_approver.as_ref().map_or("unassigned", |a| a.0.as_str()),
                    version = request.version,
                    "purchase request submitted for approval"
                );
                self.ctx.publish(
                    DomainEvent::RequestSubmitted {
                        request_id: request.id.clone(),
                        approver: request.current_approver.clone(),
                    },
                    &command.correlation_id,
                    actor,
                );
            }
            Err(error) => {
                log_rejection("submit", &command.correlation_id, Some(&command.request_id), error)
            }
        }
        result.map(|(request, _)| request)
    }

    async fn try_submit(
        &self,
        command: &SubmitRequest,
    ) -> Result<(PurchaseRequest, Actor), ApplicationError> {
        let actor = self.ctx.resolve_actor(&command.actor).await?;
        let mut request = self.get_request(&command.request_id).await?;

        self.ctx.policy.require(&actor, Capability::Submit, None)?;
        if actor.user_id != request.requested_by {
            return Err(DomainError::Forbidden(format!(
                "only the requester `{}` may submit request `{}`",
                request.requested_by, request.id
            ))
            .into());
        }
        check_expected_version(&request, command.expected_version)?;

        let read_version = request.version;
        request.apply(LifecycleAction::Submit, Utc::now())?;

        let approver =
            self.ctx.approvers.route_approver(&request.department).await.map_err(integration_error)?;
        if approver.is_none() {
            warn!(
                event_name = "procurement.request.no_approver_routed",
                correlation_id = %command.correlation_id,
                request_id = %request.id,
                department = %request.department,
                "no approver is routed for this department"
            );
        }
        request.current_approver = approver;

        let ledger = &self.ctx.ledger;
        let stored =
            self.ctx.guard.call("update_request", ledger.update_request(request, read_version)).await?;
        Ok((stored, actor))
    }

    pub async fn decide(&self, command: DecideRequest) -> Result<PurchaseRequest, ApplicationError> {
        let result = self.try_decide(&command).await;
        match &result {
            Ok((request, actor)) => {
                info!(
                    event_name = "procurement.request.decided",
                    correlation_id = %command.correlation_id,
                    request_id = %request.id,
                    approver = %actor.user_id,
                    decision = command.decision.as_str(),
                    status = request.status.as_str(),
                    version = request.version,
                    "approval decision recorded"
                );
                let event = match command.decision {
                    Decision::Approve => DomainEvent::RequestApproved {
                        request_id: request.id.clone(),
                        approver: actor.user_id.clone(),
                    },
                    Decision::Reject => DomainEvent::RequestRejected {
                        request_id: request.id.clone(),
                        approver: actor.user_id.clone(),
                        comment: command.comment.clone(),
                    },
                };
                self.ctx.publish(event, &command.correlation_id, actor);
            }
            Err(error) => {
                log_rejection("decide", &command.correlation_id, Some(&command.request_id), error)
            }
        }
        result.map(|(request, _)| request)
    }

    async fn try_decide(
        &self,
        command: &DecideRequest,
    ) -> Result<(PurchaseRequest, Actor), ApplicationError> {
        let actor = self.ctx.resolve_actor(&command.actor).await?;
        let mut request = self.get_request(&command.request_id).await?;

        self.ctx.policy.require(&actor, Capability::Approve, Some(&request.department))?;
        check_expected_version(&request, command.expected_version)?;

        let read_version = request.version;
        request.record_decision(
            actor.user_id.clone(),
            command.decision,
            command.comment.clone(),
            Utc::now(),
        )?;

        let ledger = &self.ctx.ledger;
        let stored =
            self.ctx.guard.call("update_request", ledger.update_request(request, read_version)).await?;
        Ok((stored, actor))
    }
}

pub(crate) fn check_expected_version(
    request: &PurchaseRequest,
    expected_version: Option<u64>,
) -> Result<(), DomainError> {
    match expected_version {
        Some(expected) if expected != request.version => Err(DomainError::Conflict {
            request_id: request.id.clone(),
            expected,
            actual: request.version,
        }),
        _ => Ok(()),
    }
}

pub(crate) fn log_rejection(
    operation: &'static str,
    correlation_id: &str,
    request_id: Option<&RequestId>,
    error: &ApplicationError,
) {
    warn!(
        event_name = "procurement.operation.rejected",
        correlation_id,
        operation,
        request_id = request_id.map_or("unknown", |id| id.0.as_str()),
        error_class = error.error_class(),
        error = %error,
        "procurement operation failed"
    );
}
