pub mod award;
pub mod bootstrap;
pub mod commands;
pub mod context;
pub mod guard;
pub mod intake;
pub mod lifecycle;
pub mod procurement;
pub mod ranking;
pub mod sinks;

pub use award::AwardCoordinator;
pub use bootstrap::{bootstrap, Application, BootstrapError};
pub use commands::{AwardBid, CreateRequest, DecideRequest, SubmitBid, SubmitRequest};
pub use context::EngineContext;
pub use guard::LedgerGuard;
pub use intake::BidIntake;
pub use lifecycle::LifecycleController;
pub use procurement::ProcurementEngine;
pub use ranking::BidRanking;
pub use sinks::{FanoutEventSink, TracingEventSink};
