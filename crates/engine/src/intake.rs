use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use procura_core::domain::bid::{Bid, BidId};
use procura_core::errors::{ApplicationError, DomainError, EntityKind};
use procura_db::RepositoryError;

use crate::commands::SubmitBid;
use crate::context::{integration_error, EngineContext};
use crate::guard::map_repository_error;
use crate::lifecycle::{log_rejection, LifecycleController};

/// Accepts supplier bids against approved requests.
#[derive(Clone)]
pub struct BidIntake {
    ctx: Arc<EngineContext>,
    lifecycle: LifecycleController,
}

impl BidIntake {
    pub fn new(ctx: Arc<EngineContext>, lifecycle: LifecycleController) -> Self {
        Self { ctx, lifecycle }
    }

    pub async fn submit_bid(&self, command: SubmitBid) -> Result<Bid, ApplicationError> {
        let result = self.try_submit_bid(&command).await;
        match &result {
            Ok(bid) => info!(
                event_name = "procurement.bid.submitted",
                correlation_id = %command.correlation_id,
                request_id = %bid.request_id,
                bid_id = %bid.id,
                supplier_id = %bid.supplier_id,
                bid_amount = %bid.bid_amount,
                delivery_time_days = bid.delivery_time_days,
                "bid accepted"
            ),
            Err(error) => log_rejection(
                "submit_bid",
                &command.correlation_id,
                Some(&command.submission.request_id),
                error,
            ),
        }
        result
    }

    async fn try_submit_bid(&self, command: &SubmitBid) -> Result<Bid, ApplicationError> {
        let submission = &command.submission;
        let request = self.lifecycle.get_request(&submission.request_id).await?;
        if !request.status.accepts_bids() {
            return Err(DomainError::NotBiddable {
                request_id: request.id.clone(),
                status: request.status,
            }
            .into());
        }

        submission.validate()?;

        let supplier = self
            .ctx
            .suppliers
            .find_supplier(&submission.supplier_id)
            .await
            .map_err(integration_error)?;
        if supplier.is_none() {
            return Err(
                DomainError::not_found(EntityKind::Supplier, submission.supplier_id.0.clone()).into()
            );
        }

        let bid = Bid::from_submission(
            BidId(format!("BID-{}", Uuid::new_v4().simple())),
            submission.clone(),
            Utc::now(),
        );

        // The store re-checks the status in the write itself, so an award
        // committed after the read above still turns this bid away.
        let ledger = &self.ctx.ledger;
        match self.ctx.guard.call_raw("insert_bid", ledger.insert_bid(bid.clone())).await? {
            Ok(()) => Ok(bid),
            Err(RepositoryError::StatusMismatch { request_id, status }) => {
                Err(DomainError::NotBiddable { request_id, status }.into())
            }
            Err(other) => Err(map_repository_error(other)),
        }
    }
}
