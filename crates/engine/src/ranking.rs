use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use procura_core::domain::request::RequestId;
use procura_core::domain::supplier::SupplierId;
use procura_core::errors::ApplicationError;
use procura_core::scoring::{BidScorer, RankedBid};

use crate::context::{integration_error, EngineContext};
use crate::lifecycle::LifecycleController;

/// Gathers a fresh snapshot of a request, its bids and the bidding
/// suppliers, then hands it to the pure scorer.
#[derive(Clone)]
pub struct BidRanking {
    ctx: Arc<EngineContext>,
    lifecycle: LifecycleController,
    scorer: BidScorer,
    default_top_k: usize,
}

impl BidRanking {
    pub fn new(
        ctx: Arc<EngineContext>,
        lifecycle: LifecycleController,
        scorer: BidScorer,
        default_top_k: usize,
    ) -> Self {
        Self { ctx, lifecycle, scorer, default_top_k }
    }

    /// Top `k` bids, best first; `None` uses the configured default.
    pub async fn rank_bids(
        &self,
        request_id: &RequestId,
        k: Option<usize>,
    ) -> Result<Vec<RankedBid>, ApplicationError> {
        let request = self.lifecycle.get_request(request_id).await?;
        let bids = self.lifecycle.list_bids(request_id).await?;

        let supplier_ids: BTreeSet<&SupplierId> = bids.iter().map(|bid| &bid.supplier_id).collect();
        let mut suppliers = HashMap::with_capacity(supplier_ids.len());
        for supplier_id in supplier_ids {
            let profile =
                self.ctx.suppliers.find_supplier(supplier_id).await.map_err(integration_error)?;
            if let Some(profile) = profile {
                suppliers.insert(supplier_id.clone(), profile);
            }
        }

        let k = k.unwrap_or(self.default_top_k);
        let ranked = self.scorer.top_k(&request, &bids, &suppliers, k);
        debug!(
            event_name = "procurement.bids.ranked",
            request_id = %request.id,
            bid_count = bids.len(),
            returned = ranked.len(),
            top_k = k,
            "bids ranked"
        );
        Ok(ranked)
    }
}
