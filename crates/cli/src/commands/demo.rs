//! Fixed actors and suppliers used by `procura seed` and `procura rank`.

use std::sync::Arc;

use procura_core::directory::{StaticApproverDirectory, StaticIdentityProvider};
use procura_core::domain::actor::{Actor, Role};
use procura_core::domain::supplier::{SupplierId, SupplierProfile};
use procura_engine::{Application, FanoutEventSink, ProcurementEngine, TracingEventSink};

pub const DEMO_DEPARTMENT: &str = "engineering";
pub const REQUESTER_TOKEN: &str = "demo-requester";
pub const APPROVER_TOKEN: &str = "demo-approver";
pub const ADMIN_TOKEN: &str = "demo-admin";

pub fn identity() -> StaticIdentityProvider {
    let requester = Actor::new("u-demo-requester", Role::Requester, DEMO_DEPARTMENT);
    let approver = Actor::new("u-demo-approver", Role::Approver, DEMO_DEPARTMENT);
    let admin = Actor::new("u-demo-admin", Role::Administrator, "procurement");
    StaticIdentityProvider::default()
        .with_actor(REQUESTER_TOKEN, requester)
        .with_actor(APPROVER_TOKEN, approver)
        .with_actor(ADMIN_TOKEN, admin)
}

pub fn approvers() -> StaticApproverDirectory {
    StaticApproverDirectory::default().with_approver(DEMO_DEPARTMENT, "u-demo-approver")
}

pub fn suppliers() -> Vec<SupplierProfile> {
    vec![
        profile("s-acme", "Acme Office Supply", Some(4.0), Some(80.0)),
        profile("s-bolt", "Bolt Hardware", Some(4.8), Some(92.0)),
        profile("s-crate", "Crate & Co", None, None),
    ]
}

fn profile(
    id: &str,
    company_name: &str,
    rating: Option<f64>,
    delivery_score: Option<f64>,
) -> SupplierProfile {
    SupplierProfile {
        id: SupplierId(id.to_string()),
        company_name: company_name.to_string(),
        rating,
        delivery_score,
    }
}

pub fn engine(app: &Application) -> ProcurementEngine {
    let events = FanoutEventSink::default().with_sink(TracingEventSink);
    app.engine(Arc::new(identity()), Arc::new(approvers()), Arc::new(events))
}
