use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use procura_core::domain::bid::{Bid, BidId};
use procura_core::domain::request::{PurchaseRequest, RequestId, RequestStatus};
use procura_core::errors::EntityKind;

pub mod bid;
pub mod memory;
pub mod request;
pub mod supplier;

pub use memory::InMemoryLedgerStore;
pub use request::SqlLedgerStore;
pub use supplier::SqlSupplierDirectory;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: EntityKind, id: String },
    #[error("version conflict on request `{request_id}`: expected {expected}, found {actual}")]
    VersionConflict { request_id: RequestId, expected: u64, actual: u64 },
    #[error("request `{request_id}` is {status}")]
    StatusMismatch { request_id: RequestId, status: RequestStatus },
    #[error("bid `{bid_id}` is no longer open")]
    BidClosed { bid_id: BidId },
    #[error("duplicate {entity} `{id}`")]
    Duplicate { entity: EntityKind, id: String },
}

impl RepositoryError {
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }
}

/// The writes of one award, applied as a single transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AwardCommit {
    pub request_id: RequestId,
    pub winning_bid_id: BidId,
    /// Version the coordinator read; the commit is refused if it moved.
    pub expected_version: u64,
    pub awarded_at: DateTime<Utc>,
}

/// Durable keyed storage for purchase requests and their bids.
///
/// Every request mutation is a compare-and-swap on `version`: the write
/// lands only when the stored version equals `expected_version`, and the
/// stored version is then bumped by one.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_request(
        &self,
        id: &RequestId,
    ) -> Result<Option<PurchaseRequest>, RepositoryError>;

    async fn insert_request(&self, request: PurchaseRequest) -> Result<(), RepositoryError>;

    /// Persists `request`'s mutable fields and any approval records not yet
    /// stored. Returns the request as stored, with its new version.
    async fn update_request(
        &self,
        request: PurchaseRequest,
        expected_version: u64,
    ) -> Result<PurchaseRequest, RepositoryError>;

    async fn find_bid(&self, id: &BidId) -> Result<Option<Bid>, RepositoryError>;

    /// Bids of one request ordered by `submitted_at`, then id.
    async fn list_bids_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<Bid>, RepositoryError>;

    /// Inserts `bid` only if its request is `approved` at write time.
    async fn insert_bid(&self, bid: Bid) -> Result<(), RepositoryError>;

    /// Moves the request to `ordered`, selects the winning bid and rejects
    /// every other open bid of the request, all or nothing.
    async fn commit_award(&self, award: AwardCommit) -> Result<PurchaseRequest, RepositoryError>;
}

pub(crate) fn version_to_i64(version: u64) -> Result<i64, RepositoryError> {
    i64::try_from(version)
        .map_err(|_| RepositoryError::Decode(format!("version {version} does not fit in i64")))
}

pub(crate) fn version_from_i64(value: i64) -> Result<u64, RepositoryError> {
    u64::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!("invalid value for `version` (expected u64): {value}"))
    })
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_money(
    column: &str,
    value: String,
) -> Result<rust_decimal::Decimal, RepositoryError> {
    value.parse::<rust_decimal::Decimal>().map_err(|error| {
        RepositoryError::Decode(format!("invalid amount in `{column}`: `{value}` ({error})"))
    })
}
