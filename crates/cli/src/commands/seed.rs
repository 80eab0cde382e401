use procura_core::config::LoadOptions;
use procura_core::domain::bid::BidSubmission;
use procura_core::domain::request::{Decision, NewPurchaseRequest, RequestId, Urgency};
use procura_core::domain::supplier::SupplierId;
use procura_engine::{bootstrap, CreateRequest, DecideRequest, SubmitBid, SubmitRequest};
use rust_decimal::Decimal;
use tracing::info;

use crate::commands::{
    bootstrap_failure, current_thread_runtime, demo, engine_failure, render_ranking,
    CommandResult, StepFailure,
};

/// `(supplier, amount, delivery days)` for the three demo bids.
const DEMO_BIDS: [(&str, i64, u32); 3] =
    [("s-acme", 900, 10), ("s-bolt", 950, 5), ("s-crate", 1100, 3)];

pub fn run() -> CommandResult {
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("seed", error_class, message, exit_code);
        }
    };

    let result = runtime.block_on(async {
        let app = bootstrap(LoadOptions::default()).await.map_err(bootstrap_failure)?;
        let outcome = seed_demo(&app).await;
        app.db_pool.close().await;
        outcome
    });

    CommandResult::from_step("seed", result)
}

async fn seed_demo(app: &procura_engine::Application) -> Result<String, StepFailure> {
    let directory = app.suppliers();
    for profile in demo::suppliers() {
        directory
            .save(&profile)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
    }

    let engine = demo::engine(app);
    let draft = engine
        .create_request(CreateRequest::new(demo::REQUESTER_TOKEN, demo_request()))
        .await
        .map_err(engine_failure)?;
    let submitted = engine
        .submit(SubmitRequest::new(draft.id.clone(), demo::REQUESTER_TOKEN).expecting(draft.version))
        .await
        .map_err(engine_failure)?;
    let approved = engine
        .decide(
            DecideRequest::new(
                submitted.id.clone(),
                demo::APPROVER_TOKEN,
                Decision::Approve,
                "demo approval",
            )
            .expecting(submitted.version),
        )
        .await
        .map_err(engine_failure)?;

    for (supplier, amount, days) in DEMO_BIDS {
        engine
            .submit_bid(SubmitBid::new(demo_bid(&approved.id, supplier, amount, days)))
            .await
            .map_err(engine_failure)?;
    }

    let ranked = engine.rank_bids(&approved.id, None).await.map_err(engine_failure)?;
    info!(
        event_name = "procurement.seed.completed",
        correlation_id = "seed",
        request_id = %approved.id,
        bid_count = DEMO_BIDS.len(),
        "demo procurement request seeded"
    );

    Ok(format!(
        "seeded request {} in status {} with {} bids; ranking:\n{}",
        approved.id,
        approved.status,
        DEMO_BIDS.len(),
        render_ranking(&ranked)
    ))
}

fn demo_request() -> NewPurchaseRequest {
    NewPurchaseRequest {
        title: "Developer laptops".to_string(),
        description: "Replacement cycle for the platform team".to_string(),
        category: "it-hardware".to_string(),
        quantity: 5,
        budget: Decimal::new(1000, 0),
        urgency: Urgency::High,
        department: demo::DEMO_DEPARTMENT.to_string(),
    }
}

fn demo_bid(request_id: &RequestId, supplier: &str, amount: i64, days: u32) -> BidSubmission {
    BidSubmission {
        request_id: request_id.clone(),
        supplier_id: SupplierId(supplier.to_string()),
        bid_amount: Decimal::new(amount, 0),
        delivery_time_days: days,
        proposal: format!("{supplier}: {amount} delivered in {days} days"),
    }
}
