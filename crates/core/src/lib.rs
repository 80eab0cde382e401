pub mod authz;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod scoring;

pub use authz::{Capability, CapabilityPolicy};
pub use directory::{
    ApproverDirectory, DirectoryError, IdentityProvider, StaticApproverDirectory,
    StaticIdentityProvider, StaticSupplierDirectory, SupplierDirectory,
};
pub use domain::actor::{Actor, ActorToken, Role, UserId};
pub use domain::bid::{Bid, BidId, BidStatus, BidSubmission};
pub use domain::request::{
    ApprovalRecord, Decision, NewPurchaseRequest, PurchaseRequest, RequestId, RequestStatus,
    Urgency,
};
pub use domain::supplier::{SupplierId, SupplierProfile};
pub use errors::{ApplicationError, DomainError, EntityKind, InterfaceError};
pub use events::{DomainEvent, EventEnvelope, EventSink, InMemoryEventSink};
pub use lifecycle::{LifecycleAction, TransitionOutcome};
pub use scoring::{BidScorer, RankedBid, ScoringWeights};
