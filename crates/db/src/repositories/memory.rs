use std::collections::BTreeMap;

use tokio::sync::RwLock;

use procura_core::domain::bid::{Bid, BidId, BidStatus};
use procura_core::domain::request::{PurchaseRequest, RequestId, RequestStatus};
use procura_core::errors::EntityKind;

use super::{AwardCommit, LedgerStore, RepositoryError};

#[derive(Default)]
struct LedgerState {
    requests: BTreeMap<RequestId, PurchaseRequest>,
    bids: BTreeMap<BidId, Bid>,
}

/// Ledger store held in process memory. A single lock covers requests and
/// bids so an award can rewrite both in one critical section.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<LedgerState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_version(stored: &PurchaseRequest, expected_version: u64) -> Result<(), RepositoryError> {
    if stored.version == expected_version {
        Ok(())
    } else {
        Err(RepositoryError::VersionConflict {
            request_id: stored.id.clone(),
            expected: expected_version,
            actual: stored.version,
        })
    }
}

#[async_trait::async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_request(
        &self,
        id: &RequestId,
    ) -> Result<Option<PurchaseRequest>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.requests.get(id).cloned())
    }

    async fn insert_request(&self, request: PurchaseRequest) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if state.requests.contains_key(&request.id) {
            return Err(RepositoryError::Duplicate {
                entity: EntityKind::Request,
                id: request.id.0.clone(),
            });
        }
        state.requests.insert(request.id.clone(), request);
        Ok(())
    }

    async fn update_request(
        &self,
        request: PurchaseRequest,
        expected_version: u64,
    ) -> Result<PurchaseRequest, RepositoryError> {
        let mut state = self.state.write().await;
        let stored = state
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Request, request.id.0.clone()))?;
        check_version(stored, expected_version)?;

        let recorded = stored.approval_history.len();
        stored.approval_history.extend(request.approval_history.into_iter().skip(recorded));
        stored.status = request.status;
        stored.current_approver = request.current_approver;
        stored.updated_at = request.updated_at;
        stored.version = expected_version + 1;

        Ok(stored.clone())
    }

    async fn find_bid(&self, id: &BidId) -> Result<Option<Bid>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.bids.get(id).cloned())
    }

    async fn list_bids_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<Bid>, RepositoryError> {
        let state = self.state.read().await;
        let mut bids: Vec<Bid> =
            state.bids.values().filter(|bid| &bid.request_id == request_id).cloned().collect();
        bids.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then_with(|| a.id.cmp(&b.id)));
        Ok(bids)
    }

    async fn insert_bid(&self, bid: Bid) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let request = state.requests.get(&bid.request_id).ok_or_else(|| {
            RepositoryError::not_found(EntityKind::Request, bid.request_id.0.clone())
        })?;
        if request.status != RequestStatus::Approved {
            return Err(RepositoryError::StatusMismatch {
                request_id: request.id.clone(),
                status: request.status,
            });
        }
        if state.bids.contains_key(&bid.id) {
            return Err(RepositoryError::Duplicate { entity: EntityKind::Bid, id: bid.id.0.clone() });
        }
        state.bids.insert(bid.id.clone(), bid);
        Ok(())
    }

    async fn commit_award(&self, award: AwardCommit) -> Result<PurchaseRequest, RepositoryError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let request = state.requests.get_mut(&award.request_id).ok_or_else(|| {
            RepositoryError::not_found(EntityKind::Request, award.request_id.0.clone())
        })?;
        check_version(request, award.expected_version)?;
        if request.status != RequestStatus::Approved {
            return Err(RepositoryError::StatusMismatch {
                request_id: request.id.clone(),
                status: request.status,
            });
        }

        match state.bids.get(&award.winning_bid_id) {
            Some(bid) if bid.request_id == award.request_id => {
                if bid.status != BidStatus::Submitted {
                    return Err(RepositoryError::BidClosed { bid_id: bid.id.clone() });
                }
            }
            _ => {
                return Err(RepositoryError::not_found(
                    EntityKind::Bid,
                    award.winning_bid_id.0.clone(),
                ))
            }
        }

        // Every check has passed; nothing below can fail.
        for bid in state.bids.values_mut() {
            if bid.request_id != award.request_id || bid.status != BidStatus::Submitted {
                continue;
            }
            bid.status = if bid.id == award.winning_bid_id {
                BidStatus::Selected
            } else {
                BidStatus::Rejected
            };
        }

        request.status = RequestStatus::Ordered;
        request.updated_at = award.awarded_at;
        request.version = award.expected_version + 1;

        Ok(request.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use procura_core::domain::actor::UserId;
    use procura_core::domain::bid::{Bid, BidId, BidStatus};
    use procura_core::domain::request::{
        NewPurchaseRequest, PurchaseRequest, RequestId, RequestStatus, Urgency,
    };
    use procura_core::domain::supplier::SupplierId;

    use super::InMemoryLedgerStore;
    use crate::repositories::{AwardCommit, LedgerStore, RepositoryError};

    fn approved_request(id: &str) -> PurchaseRequest {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("valid timestamp");
        let mut request = PurchaseRequest::draft(
            RequestId(id.to_owned()),
            UserId("u-req".to_owned()),
            NewPurchaseRequest {
                title: "Laptops".to_owned(),
                description: "Developer laptops".to_owned(),
                category: "it".to_owned(),
                quantity: 4,
                budget: Decimal::new(1000, 0),
                urgency: Urgency::Medium,
                department: "engineering".to_owned(),
            },
            now,
        );
        request.status = RequestStatus::Approved;
        request
    }

    fn bid(id: &str, request_id: &str, offset_secs: i64) -> Bid {
        let base = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("valid timestamp");
        Bid {
            id: BidId(id.to_owned()),
            request_id: RequestId(request_id.to_owned()),
            supplier_id: SupplierId("s-1".to_owned()),
            bid_amount: Decimal::new(900, 0),
            delivery_time_days: 10,
            proposal: "standard terms".to_owned(),
            status: BidStatus::Submitted,
            submitted_at: base + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn update_request_bumps_version_and_rejects_stale_writers() {
        let store = InMemoryLedgerStore::new();
        store.insert_request(approved_request("PR-1")).await.expect("insert");

        let mut first = store.find_request(&RequestId("PR-1".to_owned())).await.unwrap().unwrap();
        first.current_approver = Some(UserId("u-appr".to_owned()));
        let stored = store.update_request(first.clone(), 1).await.expect("first write");
        assert_eq!(stored.version, 2);

        let stale = store.update_request(first, 1).await;
        assert!(matches!(
            stale,
            Err(RepositoryError::VersionConflict { expected: 1, actual: 2, .. })
        ));
    }

    #[tokio::test]
    async fn bids_are_listed_by_submission_time_then_id() {
        let store = InMemoryLedgerStore::new();
        store.insert_request(approved_request("PR-1")).await.expect("insert");
        store.insert_bid(bid("B-3", "PR-1", 5)).await.expect("bid");
        store.insert_bid(bid("B-2", "PR-1", 0)).await.expect("bid");
        store.insert_bid(bid("B-1", "PR-1", 5)).await.expect("bid");

        let ids: Vec<String> = store
            .list_bids_for_request(&RequestId("PR-1".to_owned()))
            .await
            .expect("list")
            .into_iter()
            .map(|bid| bid.id.0)
            .collect();
        assert_eq!(ids, vec!["B-2", "B-1", "B-3"]);
    }

    #[tokio::test]
    async fn insert_bid_requires_approved_request() {
        let store = InMemoryLedgerStore::new();
        let mut draft = approved_request("PR-2");
        draft.status = RequestStatus::Draft;
        store.insert_request(draft).await.expect("insert");

        let result = store.insert_bid(bid("B-1", "PR-2", 0)).await;
        assert!(matches!(
            result,
            Err(RepositoryError::StatusMismatch { status: RequestStatus::Draft, .. })
        ));

        let missing = store.insert_bid(bid("B-9", "PR-404", 0)).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn commit_award_selects_one_and_rejects_the_rest() {
        let store = InMemoryLedgerStore::new();
        store.insert_request(approved_request("PR-1")).await.expect("insert");
        for (index, id) in ["B-1", "B-2", "B-3"].into_iter().enumerate() {
            store.insert_bid(bid(id, "PR-1", index as i64)).await.expect("bid");
        }

        let ordered = store
            .commit_award(AwardCommit {
                request_id: RequestId("PR-1".to_owned()),
                winning_bid_id: BidId("B-2".to_owned()),
                expected_version: 1,
                awarded_at: Utc::now(),
            })
            .await
            .expect("award");
        assert_eq!(ordered.status, RequestStatus::Ordered);
        assert_eq!(ordered.version, 2);

        let statuses: Vec<(String, BidStatus)> = store
            .list_bids_for_request(&RequestId("PR-1".to_owned()))
            .await
            .expect("list")
            .into_iter()
            .map(|bid| (bid.id.0, bid.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("B-1".to_owned(), BidStatus::Rejected),
                ("B-2".to_owned(), BidStatus::Selected),
                ("B-3".to_owned(), BidStatus::Rejected),
            ]
        );
    }

    #[tokio::test]
    async fn failed_award_leaves_every_record_untouched() {
        let store = InMemoryLedgerStore::new();
        store.insert_request(approved_request("PR-1")).await.expect("insert");
        store.insert_bid(bid("B-1", "PR-1", 0)).await.expect("bid");

        let result = store
            .commit_award(AwardCommit {
                request_id: RequestId("PR-1".to_owned()),
                winning_bid_id: BidId("B-404".to_owned()),
                expected_version: 1,
                awarded_at: Utc::now(),
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));

        let request = store.find_request(&RequestId("PR-1".to_owned())).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Approved);
        assert_eq!(request.version, 1);
        let bid = store.find_bid(&BidId("B-1".to_owned())).await.unwrap().unwrap();
        assert_eq!(bid.status, BidStatus::Submitted);
    }
}
