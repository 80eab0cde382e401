#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;

use procura_core::directory::{
    StaticApproverDirectory, StaticIdentityProvider, StaticSupplierDirectory,
};
use procura_core::domain::actor::{Actor, Role};
use procura_core::domain::bid::{Bid, BidSubmission};
use procura_core::domain::request::{NewPurchaseRequest, PurchaseRequest, RequestId, Urgency};
use procura_core::domain::supplier::{SupplierId, SupplierProfile};
use procura_core::errors::{ApplicationError, DomainError};
use procura_core::events::InMemoryEventSink;
use procura_core::Decision;
use procura_db::{InMemoryLedgerStore, LedgerStore};
use procura_engine::{
    CreateRequest, DecideRequest, EngineContext, ProcurementEngine, SubmitBid, SubmitRequest,
};

pub const REQUESTER: &str = "tok-requester";
pub const OTHER_REQUESTER: &str = "tok-other-requester";
pub const APPROVER: &str = "tok-approver";
pub const FINANCE_APPROVER: &str = "tok-finance-approver";
pub const ADMIN: &str = "tok-admin";
pub const SECOND_ADMIN: &str = "tok-admin-2";

pub fn identity() -> StaticIdentityProvider {
    StaticIdentityProvider::default()
        .with_actor(REQUESTER, Actor::new("u-requester", Role::Requester, "engineering"))
        .with_actor(OTHER_REQUESTER, Actor::new("u-other", Role::Requester, "engineering"))
        .with_actor(APPROVER, Actor::new("u-approver", Role::Approver, "engineering"))
        .with_actor(FINANCE_APPROVER, Actor::new("u-finance", Role::Approver, "finance"))
        .with_actor(ADMIN, Actor::new("u-admin", Role::Administrator, "procurement"))
        .with_actor(SECOND_ADMIN, Actor::new("u-admin-2", Role::Administrator, "procurement"))
}

pub fn supplier(id: &str, rating: Option<f64>) -> SupplierProfile {
    SupplierProfile {
        id: SupplierId(id.to_owned()),
        company_name: format!("{id} Trading"),
        rating,
        delivery_score: Some(80.0),
    }
}

pub fn suppliers() -> StaticSupplierDirectory {
    StaticSupplierDirectory::default()
        .with_supplier(supplier("s-a", Some(4.0)))
        .with_supplier(supplier("s-b", Some(4.8)))
        .with_supplier(supplier("s-unrated", None))
}

pub fn approvers() -> StaticApproverDirectory {
    StaticApproverDirectory::default().with_approver("engineering", "u-approver")
}

pub struct Harness {
    pub engine: ProcurementEngine,
    pub events: InMemoryEventSink,
    pub ledger: Arc<InMemoryLedgerStore>,
}

pub fn harness() -> Harness {
    harness_with_approvers(approvers())
}

pub fn harness_with_approvers(approvers: StaticApproverDirectory) -> Harness {
    let ledger = Arc::new(InMemoryLedgerStore::new());
    let events = InMemoryEventSink::default();
    let ctx = EngineContext::new(
        ledger.clone(),
        Arc::new(identity()),
        Arc::new(suppliers()),
        Arc::new(approvers),
        Arc::new(events.clone()),
    );
    Harness { engine: ProcurementEngine::new(ctx), events, ledger }
}

pub fn engine_over(ledger: Arc<dyn LedgerStore>, events: InMemoryEventSink) -> ProcurementEngine {
    let ctx = EngineContext::new(
        ledger,
        Arc::new(identity()),
        Arc::new(suppliers()),
        Arc::new(approvers()),
        Arc::new(events),
    );
    ProcurementEngine::new(ctx)
}

pub fn laptops(budget: i64) -> NewPurchaseRequest {
    NewPurchaseRequest {
        title: "Developer laptops".to_owned(),
        description: "Replacement cycle for the platform team".to_owned(),
        category: "it-hardware".to_owned(),
        quantity: 5,
        budget: Decimal::new(budget, 0),
        urgency: Urgency::High,
        department: "engineering".to_owned(),
    }
}

pub fn bid(request_id: &RequestId, supplier_id: &str, amount: i64, days: u32) -> SubmitBid {
    SubmitBid::new(BidSubmission {
        request_id: request_id.clone(),
        supplier_id: SupplierId(supplier_id.to_owned()),
        bid_amount: Decimal::new(amount, 0),
        delivery_time_days: days,
        proposal: format!("{supplier_id} offer: {amount} in {days} days"),
    })
}

pub async fn draft(engine: &ProcurementEngine) -> PurchaseRequest {
    engine.create_request(CreateRequest::new(REQUESTER, laptops(1000))).await.expect("create draft")
}

pub async fn submitted(engine: &ProcurementEngine) -> PurchaseRequest {
    let request = draft(engine).await;
    engine.submit(SubmitRequest::new(request.id, REQUESTER)).await.expect("submit")
}

pub async fn approved(engine: &ProcurementEngine) -> PurchaseRequest {
    let request = submitted(engine).await;
    engine
        .decide(DecideRequest::new(request.id, APPROVER, Decision::Approve, "within budget"))
        .await
        .expect("approve")
}

pub async fn approved_with_bids(engine: &ProcurementEngine) -> (PurchaseRequest, Bid, Bid) {
    let request = approved(engine).await;
    let a = engine.submit_bid(bid(&request.id, "s-a", 900, 10)).await.expect("bid A");
    let b = engine.submit_bid(bid(&request.id, "s-b", 950, 5)).await.expect("bid B");
    (request, a, b)
}

pub fn domain_error(result: Result<impl std::fmt::Debug, ApplicationError>) -> DomainError {
    match result {
        Err(ApplicationError::Domain(error)) => error,
        other => panic!("expected a domain error, got {other:?}"),
    }
}
