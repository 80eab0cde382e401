mod support;

use procura_core::domain::bid::{BidId, BidStatus};
use procura_core::domain::request::{Decision, RequestId, RequestStatus};
use procura_core::domain::supplier::SupplierId;
use procura_core::errors::{DomainError, EntityKind};
use procura_core::events::DomainEvent;
use procura_core::lifecycle::LifecycleAction;
use procura_core::UserId;
use procura_db::LedgerStore;
use procura_engine::{AwardBid, CreateRequest, DecideRequest, SubmitRequest};

use support::*;

#[tokio::test]
async fn request_moves_from_draft_to_ordered_with_one_winner() {
    let h = harness();

    let draft = draft(&h.engine).await;
    assert_eq!(draft.status, RequestStatus::Draft);
    assert_eq!(draft.version, 1);
    assert_eq!(draft.requested_by, UserId("u-requester".to_owned()));

    let submitted = h
        .engine
        .submit(SubmitRequest::new(draft.id.clone(), REQUESTER).expecting(1))
        .await
        .expect("submit");
    assert_eq!(submitted.status, RequestStatus::Submitted);
    assert_eq!(submitted.current_approver, Some(UserId("u-approver".to_owned())));
    assert_eq!(submitted.version, 2);
    assert!(submitted.approval_history.is_empty());

    let approved = h
        .engine
        .decide(
            DecideRequest::new(draft.id.clone(), APPROVER, Decision::Approve, "fits the budget")
                .expecting(2),
        )
        .await
        .expect("approve");
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.version, 3);
    assert_eq!(approved.approval_history.len(), 1);
    assert_eq!(approved.approval_history[0].approver, UserId("u-approver".to_owned()));
    assert_eq!(approved.approval_history[0].comment, "fits the budget");

    let a = h.engine.submit_bid(bid(&draft.id, "s-a", 900, 10)).await.expect("bid A");
    let b = h.engine.submit_bid(bid(&draft.id, "s-b", 950, 5)).await.expect("bid B");
    let c = h.engine.submit_bid(bid(&draft.id, "s-a", 990, 7)).await.expect("second bid from s-a");
    assert_eq!(a.status, BidStatus::Submitted);

    let bids_before = h.engine.get_request(&draft.id).await.expect("reload");
    assert_eq!(bids_before.version, 3, "bid intake leaves the request version alone");

    let ordered = h
        .engine
        .award(AwardBid::new(draft.id.clone(), ADMIN, b.id.clone()).expecting(3))
        .await
        .expect("award");
    assert_eq!(ordered.status, RequestStatus::Ordered);
    assert_eq!(ordered.version, 4);

    let bids = h.engine.list_bids(&draft.id).await.expect("bids");
    let status_of = |id: &BidId| {
        bids.iter().find(|bid| &bid.id == id).map(|bid| bid.status).expect("bid is listed")
    };
    assert_eq!(bids.len(), 3);
    assert_eq!(status_of(&a.id), BidStatus::Rejected);
    assert_eq!(status_of(&b.id), BidStatus::Selected);
    assert_eq!(status_of(&c.id), BidStatus::Rejected);

    assert_eq!(h.events.names(), vec!["request.submitted", "request.approved", "request.awarded"]);
    let awarded = h.events.events().pop().expect("award event");
    assert_eq!(
        awarded.event,
        DomainEvent::RequestAwarded { request_id: draft.id.clone(), bid_id: b.id.clone() }
    );
    assert_eq!(awarded.actor, "u-admin");
}

#[tokio::test]
async fn ordered_requests_refuse_more_bids_and_a_second_award() {
    let h = harness();
    let (request, a, b) = approved_with_bids(&h.engine).await;
    h.engine.award(AwardBid::new(request.id.clone(), ADMIN, a.id.clone())).await.expect("award");

    let late = domain_error(h.engine.submit_bid(bid(&request.id, "s-b", 800, 3)).await);
    assert!(matches!(late, DomainError::NotBiddable { status: RequestStatus::Ordered, .. }));

    let again = domain_error(h.engine.award(AwardBid::new(request.id.clone(), ADMIN, b.id)).await);
    assert_eq!(
        again,
        DomainError::InvalidTransition { from: RequestStatus::Ordered, action: LifecycleAction::Award }
    );

    let bids = h.engine.list_bids(&request.id).await.expect("bids");
    assert_eq!(bids.len(), 2, "no bid may be created once the request is ordered");
    assert_eq!(bids.iter().filter(|bid| bid.status == BidStatus::Selected).count(), 1);
    assert_eq!(h.events.names().iter().filter(|name| **name == "request.awarded").count(), 1);
}

#[tokio::test]
async fn draft_requests_are_not_biddable() {
    let h = harness();
    let request = draft(&h.engine).await;

    let error = domain_error(h.engine.submit_bid(bid(&request.id, "s-a", 900, 10)).await);
    assert_eq!(
        error,
        DomainError::NotBiddable { request_id: request.id.clone(), status: RequestStatus::Draft }
    );
    assert!(h.engine.list_bids(&request.id).await.expect("bids").is_empty());
}

#[tokio::test]
async fn rejected_requests_are_terminal() {
    let h = harness();
    let request = submitted(&h.engine).await;

    let rejected = h
        .engine
        .decide(DecideRequest::new(request.id.clone(), APPROVER, Decision::Reject, "duplicate ask"))
        .await
        .expect("reject");
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.approval_history.len(), 1);
    assert_eq!(rejected.approval_history[0].decision, Decision::Reject);

    let bid_error = domain_error(h.engine.submit_bid(bid(&request.id, "s-a", 900, 10)).await);
    assert!(matches!(bid_error, DomainError::NotBiddable { status: RequestStatus::Rejected, .. }));

    let decide_again = domain_error(
        h.engine
            .decide(DecideRequest::new(request.id.clone(), APPROVER, Decision::Approve, "retry"))
            .await,
    );
    assert_eq!(
        decide_again,
        DomainError::InvalidTransition {
            from: RequestStatus::Rejected,
            action: LifecycleAction::Approve,
        }
    );

    let stored = h.engine.get_request(&request.id).await.expect("reload");
    assert_eq!(stored.status, RequestStatus::Rejected);
    assert_eq!(stored.approval_history.len(), 1, "failed decisions append nothing");

    assert_eq!(h.events.names(), vec!["request.submitted", "request.rejected"]);
    assert!(matches!(
        h.events.events()[1].event,
        DomainEvent::RequestRejected { ref comment, .. } if comment == "duplicate ask"
    ));
}

#[tokio::test]
async fn transitions_outside_the_graph_are_refused() {
    let h = harness();
    let request = draft(&h.engine).await;

    let decide_draft = domain_error(
        h.engine
            .decide(DecideRequest::new(request.id.clone(), APPROVER, Decision::Approve, "early"))
            .await,
    );
    assert!(matches!(decide_draft, DomainError::InvalidTransition { from: RequestStatus::Draft, .. }));

    let submitted =
        h.engine.submit(SubmitRequest::new(request.id.clone(), REQUESTER)).await.expect("submit");
    let resubmit =
        domain_error(h.engine.submit(SubmitRequest::new(request.id.clone(), REQUESTER)).await);
    assert!(matches!(
        resubmit,
        DomainError::InvalidTransition { from: RequestStatus::Submitted, action: LifecycleAction::Submit }
    ));

    let award_submitted = domain_error(
        h.engine.award(AwardBid::new(request.id.clone(), ADMIN, BidId("BID-x".to_owned()))).await,
    );
    assert!(matches!(
        award_submitted,
        DomainError::InvalidTransition { from: RequestStatus::Submitted, action: LifecycleAction::Award }
    ));

    let stored = h.engine.get_request(&request.id).await.expect("reload");
    assert_eq!(stored, submitted);
}

#[tokio::test]
async fn role_and_ownership_checks_return_forbidden() {
    let h = harness();
    let request = draft(&h.engine).await;

    let foreign_submit =
        domain_error(h.engine.submit(SubmitRequest::new(request.id.clone(), OTHER_REQUESTER)).await);
    assert!(matches!(foreign_submit, DomainError::Forbidden(_)));

    let unknown_actor =
        domain_error(h.engine.submit(SubmitRequest::new(request.id.clone(), "tok-nobody")).await);
    assert!(matches!(unknown_actor, DomainError::Forbidden(_)));

    h.engine.submit(SubmitRequest::new(request.id.clone(), REQUESTER)).await.expect("submit");

    let requester_decides = domain_error(
        h.engine
            .decide(DecideRequest::new(request.id.clone(), REQUESTER, Decision::Approve, "mine"))
            .await,
    );
    assert!(matches!(requester_decides, DomainError::Forbidden(_)));

    let other_department = domain_error(
        h.engine
            .decide(DecideRequest::new(
                request.id.clone(),
                FINANCE_APPROVER,
                Decision::Approve,
                "not my department",
            ))
            .await,
    );
    assert!(matches!(other_department, DomainError::Forbidden(_)));

    h.engine
        .decide(DecideRequest::new(request.id.clone(), ADMIN, Decision::Approve, "admin override"))
        .await
        .expect("administrators approve across departments");

    let a = h.engine.submit_bid(bid(&request.id, "s-a", 900, 10)).await.expect("bid");
    let approver_awards =
        domain_error(h.engine.award(AwardBid::new(request.id.clone(), APPROVER, a.id)).await);
    assert!(matches!(approver_awards, DomainError::Forbidden(_)));

    let stored = h.engine.get_request(&request.id).await.expect("reload");
    assert_eq!(stored.status, RequestStatus::Approved);
}

#[tokio::test]
async fn unknown_records_return_not_found() {
    let h = harness();
    let missing = RequestId("PR-missing".to_owned());

    let submit = domain_error(h.engine.submit(SubmitRequest::new(missing.clone(), REQUESTER)).await);
    assert!(matches!(submit, DomainError::NotFound { entity: EntityKind::Request, .. }));
    let rank = domain_error(h.engine.rank_bids(&missing, None).await);
    assert!(matches!(rank, DomainError::NotFound { entity: EntityKind::Request, .. }));
    let bid_on_missing = domain_error(h.engine.submit_bid(bid(&missing, "s-a", 900, 10)).await);
    assert!(matches!(bid_on_missing, DomainError::NotFound { entity: EntityKind::Request, .. }));

    let (request, _, _) = approved_with_bids(&h.engine).await;
    let unknown_supplier = domain_error(h.engine.submit_bid(bid(&request.id, "s-ghost", 700, 4)).await);
    assert_eq!(unknown_supplier, DomainError::not_found(EntityKind::Supplier, "s-ghost"));

    let unknown_bid = domain_error(
        h.engine.award(AwardBid::new(request.id.clone(), ADMIN, BidId("BID-none".to_owned()))).await,
    );
    assert!(matches!(unknown_bid, DomainError::NotFound { entity: EntityKind::Bid, .. }));

    let (other_request, foreign_bid, _) = approved_with_bids(&h.engine).await;
    let cross_request = domain_error(
        h.engine.award(AwardBid::new(request.id.clone(), ADMIN, foreign_bid.id.clone())).await,
    );
    assert!(matches!(cross_request, DomainError::NotFound { entity: EntityKind::Bid, .. }));

    let untouched = h.engine.get_request(&other_request.id).await.expect("reload");
    assert_eq!(untouched.status, RequestStatus::Approved);
}

#[tokio::test]
async fn malformed_input_is_a_validation_error() {
    let h = harness();

    let zero_budget =
        domain_error(h.engine.create_request(CreateRequest::new(REQUESTER, laptops(0))).await);
    assert!(matches!(zero_budget, DomainError::Validation(_)));

    let mut untitled = laptops(1000);
    untitled.title = "  ".to_owned();
    let untitled = domain_error(h.engine.create_request(CreateRequest::new(REQUESTER, untitled)).await);
    assert!(matches!(untitled, DomainError::Validation(_)));

    let request = approved(&h.engine).await;
    let zero_amount = domain_error(h.engine.submit_bid(bid(&request.id, "s-a", 0, 10)).await);
    assert!(matches!(zero_amount, DomainError::Validation(_)));
    let zero_days = domain_error(h.engine.submit_bid(bid(&request.id, "s-a", 900, 0)).await);
    assert!(matches!(zero_days, DomainError::Validation(_)));

    let mut blank = bid(&request.id, "s-a", 900, 10);
    blank.submission.proposal = String::new();
    let blank = domain_error(h.engine.submit_bid(blank).await);
    assert_eq!(blank, DomainError::Validation("proposal must not be empty".to_owned()));

    assert!(h.engine.list_bids(&request.id).await.expect("bids").is_empty());
}

#[tokio::test]
async fn stale_expected_version_is_a_retryable_conflict() {
    let h = harness();
    let request = submitted(&h.engine).await;

    let result = h
        .engine
        .decide(
            DecideRequest::new(request.id.clone(), APPROVER, Decision::Approve, "stale view")
                .expecting(1),
        )
        .await;
    let error = result.expect_err("stale version must be refused");
    assert!(error.is_retryable());
    assert_eq!(
        error.domain(),
        Some(&DomainError::Conflict { request_id: request.id.clone(), expected: 1, actual: 2 })
    );

    let stored = h.ledger.find_request(&request.id).await.expect("read").expect("present");
    assert_eq!(stored.status, RequestStatus::Submitted);
    assert_eq!(stored.version, 2);

    h.engine
        .decide(
            DecideRequest::new(request.id.clone(), APPROVER, Decision::Approve, "fresh view")
                .expecting(stored.version),
        )
        .await
        .expect("retry with the fresh version succeeds");
}

#[tokio::test]
async fn department_without_routed_approver_still_submits() {
    let h = harness_with_approvers(procura_core::StaticApproverDirectory::default());
    let request = draft(&h.engine).await;

    let submitted =
        h.engine.submit(SubmitRequest::new(request.id.clone(), REQUESTER)).await.expect("submit");
    assert_eq!(submitted.status, RequestStatus::Submitted);
    assert_eq!(submitted.current_approver, None);
    assert_eq!(
        h.events.events()[0].event,
        DomainEvent::RequestSubmitted { request_id: request.id, approver: None }
    );
}

#[tokio::test]
async fn ranking_follows_the_weighted_formula() {
    let h = harness();
    let (request, a, b) = approved_with_bids(&h.engine).await;

    let ranked = h.engine.rank_bids(&request.id, None).await.expect("rank");
    assert_eq!(ranked.len(), 2);

    // Price: A is cheapest (1.0), B dearest (0.0). Delivery: B fastest.
    // A = 0.5*1 + 0.3*0 + 0.2*0.80 = 0.660
    // B = 0.5*0 + 0.3*1 + 0.2*0.96 = 0.492
    assert_eq!(ranked[0].bid.id, a.id);
    assert_eq!(ranked[0].rank, 1);
    assert!((ranked[0].score.composite - 0.660).abs() < 1e-9);
    assert!((ranked[0].score.components.reputation - 0.80).abs() < 1e-9);
    assert_eq!(ranked[1].bid.id, b.id);
    assert_eq!(ranked[1].rank, 2);
    assert!((ranked[1].score.composite - 0.492).abs() < 1e-9);
    assert!((ranked[1].score.components.delivery - 1.0).abs() < 1e-9);

    let again = h.engine.rank_bids(&request.id, None).await.expect("rank again");
    assert_eq!(again, ranked, "ranking an unchanged snapshot is deterministic");

    let top_one = h.engine.rank_bids(&request.id, Some(1)).await.expect("top 1");
    assert_eq!(top_one.len(), 1);
    assert_eq!(top_one[0].bid.id, a.id);
}

#[tokio::test]
async fn ranking_without_bids_is_empty() {
    let h = harness();
    let request = approved(&h.engine).await;

    let ranked = h.engine.rank_bids(&request.id, Some(5)).await.expect("rank");
    assert!(ranked.is_empty());
}

#[tokio::test]
async fn unrated_suppliers_score_a_neutral_reputation() {
    let h = harness();
    let request = approved(&h.engine).await;
    let bid = h.engine.submit_bid(bid(&request.id, "s-unrated", 900, 10)).await.expect("bid");
    assert_eq!(bid.supplier_id, SupplierId("s-unrated".to_owned()));

    let ranked = h.engine.rank_bids(&request.id, None).await.expect("rank");
    assert!((ranked[0].score.components.reputation - 0.5).abs() < 1e-9);
}
