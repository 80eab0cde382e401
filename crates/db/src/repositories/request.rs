use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use procura_core::domain::actor::UserId;
use procura_core::domain::bid::{Bid, BidId};
use procura_core::domain::request::{
    ApprovalRecord, Decision, PurchaseRequest, RequestId, RequestStatus, Urgency,
};
use procura_core::errors::EntityKind;

use super::{
    bid, parse_money, parse_timestamp, parse_u32, version_from_i64, version_to_i64, AwardCommit,
    LedgerStore, RepositoryError,
};
use crate::DbPool;

/// SQLite-backed ledger. Request writes are `UPDATE ... WHERE version = ?`
/// statements; the award runs in one transaction that writes before it reads
/// so SQLite takes the write lock up front.
pub struct SqlLedgerStore {
    pool: DbPool,
}

impl SqlLedgerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fixed-width RFC 3339 so TEXT ordering matches time ordering.
pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[async_trait::async_trait]
impl LedgerStore for SqlLedgerStore {
    async fn find_request(
        &self,
        id: &RequestId,
    ) -> Result<Option<PurchaseRequest>, RepositoryError> {
        // Row and history come from one snapshot so they agree on the version.
        let mut tx = self.pool.begin().await?;
        let request = load_request(&mut tx, id).await?;
        tx.commit().await?;
        Ok(request)
    }

    async fn insert_request(&self, request: PurchaseRequest) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO purchase_request (id, title, description, category, quantity, budget,
                                           urgency, department, requested_by, current_approver,
                                           status, version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&request.id.0)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.category)
        .bind(i64::from(request.quantity))
        .bind(request.budget.to_string())
        .bind(request.urgency.as_str())
        .bind(&request.department)
        .bind(&request.requested_by.0)
        .bind(request.current_approver.as_ref().map(|approver| approver.0.clone()))
        .bind(request.status.as_str())
        .bind(version_to_i64(request.version)?)
        .bind(format_timestamp(&request.created_at))
        .bind(format_timestamp(&request.updated_at))
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(RepositoryError::Duplicate {
                entity: EntityKind::Request,
                id: request.id.0.clone(),
            });
        }

        append_decisions(&mut tx, &request.id, &request.approval_history, 0).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_request(
        &self,
        request: PurchaseRequest,
        expected_version: u64,
    ) -> Result<PurchaseRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE purchase_request
             SET status = ?, current_approver = ?, updated_at = ?, version = version + 1
             WHERE id = ? AND version = ?",
        )
        .bind(request.status.as_str())
        .bind(request.current_approver.as_ref().map(|approver| approver.0.clone()))
        .bind(format_timestamp(&request.updated_at))
        .bind(&request.id.0)
        .bind(version_to_i64(expected_version)?)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(diagnose_guard_failure(&mut tx, &request.id, expected_version, None).await?);
        }

        let recorded: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM approval_decision WHERE request_id = ?")
                .bind(&request.id.0)
                .fetch_one(&mut *tx)
                .await?;
        let recorded = usize::try_from(recorded).map_err(|_| {
            RepositoryError::Decode(format!("negative approval_decision count {recorded}"))
        })?;
        append_decisions(&mut tx, &request.id, &request.approval_history, recorded).await?;

        let stored = load_request(&mut tx, &request.id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Request, request.id.0.clone()))?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn find_bid(&self, id: &BidId) -> Result<Option<Bid>, RepositoryError> {
        bid::find(&self.pool, id).await
    }

    async fn list_bids_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<Bid>, RepositoryError> {
        bid::list_for_request(&self.pool, request_id).await
    }

    async fn insert_bid(&self, new_bid: Bid) -> Result<(), RepositoryError> {
        let written = match bid::insert_if_request_approved(&self.pool, &new_bid).await {
            Ok(written) => written,
            Err(RepositoryError::Database(sqlx::Error::Database(error)))
                if error.is_unique_violation() =>
            {
                return Err(RepositoryError::Duplicate {
                    entity: EntityKind::Bid,
                    id: new_bid.id.0.clone(),
                });
            }
            Err(error) => return Err(error),
        };

        if written == 1 {
            return Ok(());
        }

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM purchase_request WHERE id = ?")
                .bind(&new_bid.request_id.0)
                .fetch_optional(&self.pool)
                .await?;
        match status {
            None => Err(RepositoryError::not_found(EntityKind::Request, new_bid.request_id.0)),
            Some(raw) => Err(RepositoryError::StatusMismatch {
                request_id: new_bid.request_id,
                status: parse_status(&raw)?,
            }),
        }
    }

    async fn commit_award(&self, award: AwardCommit) -> Result<PurchaseRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE purchase_request
             SET status = 'ordered', updated_at = ?, version = version + 1
             WHERE id = ? AND version = ? AND status = 'approved'",
        )
        .bind(format_timestamp(&award.awarded_at))
        .bind(&award.request_id.0)
        .bind(version_to_i64(award.expected_version)?)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let error = diagnose_guard_failure(
                &mut tx,
                &award.request_id,
                award.expected_version,
                Some(RequestStatus::Approved),
            )
            .await?;
            return Err(error);
        }

        // Dropping `tx` on an early return rolls the request update back.
        bid::settle_award(&mut tx, &award.request_id, &award.winning_bid_id).await?;

        let stored = load_request(&mut tx, &award.request_id).await?.ok_or_else(|| {
            RepositoryError::not_found(EntityKind::Request, award.request_id.0.clone())
        })?;
        tx.commit().await?;
        Ok(stored)
    }
}

/// Explains why a version-guarded update touched no row.
async fn diagnose_guard_failure(
    conn: &mut SqliteConnection,
    id: &RequestId,
    expected_version: u64,
    required_status: Option<RequestStatus>,
) -> Result<RepositoryError, RepositoryError> {
    let row = sqlx::query("SELECT status, version FROM purchase_request WHERE id = ?")
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(RepositoryError::not_found(EntityKind::Request, id.0.clone()));
    };

    let actual = version_from_i64(row.try_get("version")?)?;
    if actual != expected_version {
        return Ok(RepositoryError::VersionConflict {
            request_id: id.clone(),
            expected: expected_version,
            actual,
        });
    }

    let status = parse_status(&row.try_get::<String, _>("status")?)?;
    match required_status {
        Some(required) if required != status => {
            Ok(RepositoryError::StatusMismatch { request_id: id.clone(), status })
        }
        _ => Err(RepositoryError::Decode(format!(
            "guarded update on request `{id}` matched no row although version and status agree"
        ))),
    }
}

async fn append_decisions(
    conn: &mut SqliteConnection,
    request_id: &RequestId,
    history: &[ApprovalRecord],
    already_recorded: usize,
) -> Result<(), RepositoryError> {
    for (seq, record) in history.iter().enumerate().skip(already_recorded) {
        let seq = i64::try_from(seq)
            .map_err(|_| RepositoryError::Decode(format!("approval sequence {seq} overflows")))?;
        sqlx::query(
            "INSERT INTO approval_decision (request_id, seq, approver, decision, comment, decided_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&request_id.0)
        .bind(seq)
        .bind(&record.approver.0)
        .bind(record.decision.as_str())
        .bind(&record.comment)
        .bind(format_timestamp(&record.decided_at))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn load_request(
    conn: &mut SqliteConnection,
    id: &RequestId,
) -> Result<Option<PurchaseRequest>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, title, description, category, quantity, budget, urgency, department,
                requested_by, current_approver, status, version, created_at, updated_at
         FROM purchase_request WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let history_rows = sqlx::query(
        "SELECT approver, decision, comment, decided_at
         FROM approval_decision WHERE request_id = ? ORDER BY seq ASC",
    )
    .bind(&id.0)
    .fetch_all(&mut *conn)
    .await?;

    let approval_history =
        history_rows.into_iter().map(decision_from_row).collect::<Result<Vec<_>, _>>()?;
    request_from_row(row, approval_history).map(Some)
}

fn request_from_row(
    row: SqliteRow,
    approval_history: Vec<ApprovalRecord>,
) -> Result<PurchaseRequest, RepositoryError> {
    let urgency_raw = row.try_get::<String, _>("urgency")?;
    let urgency = Urgency::parse(&urgency_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown urgency `{urgency_raw}`")))?;

    Ok(PurchaseRequest {
        id: RequestId(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        quantity: parse_u32("quantity", row.try_get("quantity")?)?,
        budget: parse_money("budget", row.try_get("budget")?)?,
        urgency,
        department: row.try_get("department")?,
        requested_by: UserId(row.try_get("requested_by")?),
        current_approver: row.try_get::<Option<String>, _>("current_approver")?.map(UserId),
        status: parse_status(&row.try_get::<String, _>("status")?)?,
        approval_history,
        version: version_from_i64(row.try_get("version")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn decision_from_row(row: SqliteRow) -> Result<ApprovalRecord, RepositoryError> {
    let decision_raw = row.try_get::<String, _>("decision")?;
    let decision = Decision::parse(&decision_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown decision `{decision_raw}`")))?;

    Ok(ApprovalRecord {
        approver: UserId(row.try_get("approver")?),
        decision,
        comment: row.try_get("comment")?,
        decided_at: parse_timestamp("decided_at", row.try_get("decided_at")?)?,
    })
}

fn parse_status(raw: &str) -> Result<RequestStatus, RepositoryError> {
    RequestStatus::parse(raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request status `{raw}`")))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use procura_core::domain::actor::UserId;
    use procura_core::domain::bid::{Bid, BidId, BidStatus};
    use procura_core::domain::request::{
        Decision, NewPurchaseRequest, PurchaseRequest, RequestId, RequestStatus, Urgency,
    };
    use procura_core::domain::supplier::SupplierId;

    use super::SqlLedgerStore;
    use crate::repositories::{AwardCommit, LedgerStore, RepositoryError};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn draft(id: &str) -> PurchaseRequest {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("valid timestamp");
        PurchaseRequest::draft(
            RequestId(id.to_owned()),
            UserId("u-req".to_owned()),
            NewPurchaseRequest {
                title: "Standing desks".to_owned(),
                description: "Ergonomic desks for the new office".to_owned(),
                category: "furniture".to_owned(),
                quantity: 12,
                budget: Decimal::new(1_250_050, 2),
                urgency: Urgency::High,
                department: "operations".to_owned(),
            },
            now,
        )
    }

    fn bid(id: &str, request_id: &str, offset_secs: i64) -> Bid {
        let base = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("valid timestamp");
        Bid {
            id: BidId(id.to_owned()),
            request_id: RequestId(request_id.to_owned()),
            supplier_id: SupplierId("s-1".to_owned()),
            bid_amount: Decimal::new(1_199_999, 2),
            delivery_time_days: 14,
            proposal: "delivery and assembly included".to_owned(),
            status: BidStatus::Submitted,
            submitted_at: base + Duration::milliseconds(offset_secs * 1_000 + 1),
        }
    }

    async fn approve(store: &SqlLedgerStore, id: &str) -> PurchaseRequest {
        let mut request = store.find_request(&RequestId(id.to_owned())).await.unwrap().unwrap();
        let now = Utc::now();
        request.apply(procura_core::lifecycle::LifecycleAction::Submit, now).expect("submit");
        let version = request.version;
        let request = store.update_request(request, version).await.expect("store submit");
        let mut request = request;
        request
            .record_decision(UserId("u-appr".to_owned()), Decision::Approve, "ok", now)
            .expect("approve");
        let version = request.version;
        store.update_request(request, version).await.expect("store approve")
    }

    #[tokio::test]
    async fn request_round_trip_preserves_money_history_and_version() {
        let pool = setup_pool().await;
        let store = SqlLedgerStore::new(pool.clone());
        store.insert_request(draft("PR-100")).await.expect("insert");

        let approved = approve(&store, "PR-100").await;
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.version, 3);
        assert_eq!(approved.budget, Decimal::new(1_250_050, 2));
        assert_eq!(approved.approval_history.len(), 1);
        assert_eq!(approved.approval_history[0].decision, Decision::Approve);

        let reread = store.find_request(&RequestId("PR-100".to_owned())).await.unwrap().unwrap();
        assert_eq!(reread, approved);

        let duplicate = store.insert_request(draft("PR-100")).await;
        assert!(matches!(duplicate, Err(RepositoryError::Duplicate { .. })));

        pool.close().await;
    }

    #[tokio::test]
    async fn stale_update_is_reported_as_version_conflict() {
        let pool = setup_pool().await;
        let store = SqlLedgerStore::new(pool.clone());
        store.insert_request(draft("PR-101")).await.expect("insert");

        let mut request = store.find_request(&RequestId("PR-101".to_owned())).await.unwrap().unwrap();
        request.current_approver = Some(UserId("u-appr".to_owned()));
        store.update_request(request.clone(), 1).await.expect("first write");

        let stale = store.update_request(request, 1).await;
        assert!(matches!(
            stale,
            Err(RepositoryError::VersionConflict { expected: 1, actual: 2, .. })
        ));

        let missing = store.update_request(draft("PR-404"), 1).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound { .. })));

        pool.close().await;
    }

    #[tokio::test]
    async fn bid_insert_is_conditional_on_approved_status() {
        let pool = setup_pool().await;
        let store = SqlLedgerStore::new(pool.clone());
        store.insert_request(draft("PR-102")).await.expect("insert");

        let early = store.insert_bid(bid("B-1", "PR-102", 0)).await;
        assert!(matches!(
            early,
            Err(RepositoryError::StatusMismatch { status: RequestStatus::Draft, .. })
        ));

        approve(&store, "PR-102").await;
        store.insert_bid(bid("B-1", "PR-102", 1)).await.expect("bid accepted");
        let duplicate = store.insert_bid(bid("B-1", "PR-102", 2)).await;
        assert!(matches!(duplicate, Err(RepositoryError::Duplicate { .. })));

        let orphan = store.insert_bid(bid("B-2", "PR-404", 0)).await;
        assert!(matches!(orphan, Err(RepositoryError::NotFound { .. })));

        let stored = store.find_bid(&BidId("B-1".to_owned())).await.unwrap().unwrap();
        assert_eq!(stored, bid("B-1", "PR-102", 1));

        pool.close().await;
    }

    #[tokio::test]
    async fn award_commits_request_and_bids_together() {
        let pool = setup_pool().await;
        let store = SqlLedgerStore::new(pool.clone());
        store.insert_request(draft("PR-103")).await.expect("insert");
        let approved = approve(&store, "PR-103").await;
        for (offset, id) in ["B-1", "B-2", "B-3"].into_iter().enumerate() {
            store.insert_bid(bid(id, "PR-103", offset as i64)).await.expect("bid");
        }

        let ordered = store
            .commit_award(AwardCommit {
                request_id: RequestId("PR-103".to_owned()),
                winning_bid_id: BidId("B-3".to_owned()),
                expected_version: approved.version,
                awarded_at: Utc::now(),
            })
            .await
            .expect("award");
        assert_eq!(ordered.status, RequestStatus::Ordered);
        assert_eq!(ordered.version, approved.version + 1);

        let statuses: Vec<BidStatus> = store
            .list_bids_for_request(&RequestId("PR-103".to_owned()))
            .await
            .expect("list")
            .into_iter()
            .map(|bid| bid.status)
            .collect();
        assert_eq!(statuses, vec![BidStatus::Rejected, BidStatus::Rejected, BidStatus::Selected]);

        let late = store.insert_bid(bid("B-4", "PR-103", 9)).await;
        assert!(matches!(
            late,
            Err(RepositoryError::StatusMismatch { status: RequestStatus::Ordered, .. })
        ));

        pool.close().await;
    }

    #[tokio::test]
    async fn award_with_unknown_bid_rolls_back_the_request_update() {
        let pool = setup_pool().await;
        let store = SqlLedgerStore::new(pool.clone());
        store.insert_request(draft("PR-104")).await.expect("insert");
        let approved = approve(&store, "PR-104").await;
        store.insert_bid(bid("B-1", "PR-104", 0)).await.expect("bid");

        let result = store
            .commit_award(AwardCommit {
                request_id: RequestId("PR-104".to_owned()),
                winning_bid_id: BidId("B-404".to_owned()),
                expected_version: approved.version,
                awarded_at: Utc::now(),
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));

        let request = store.find_request(&RequestId("PR-104".to_owned())).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Approved);
        assert_eq!(request.version, approved.version);
        let bid = store.find_bid(&BidId("B-1".to_owned())).await.unwrap().unwrap();
        assert_eq!(bid.status, BidStatus::Submitted);

        let stale = store
            .commit_award(AwardCommit {
                request_id: RequestId("PR-104".to_owned()),
                winning_bid_id: BidId("B-1".to_owned()),
                expected_version: approved.version - 1,
                awarded_at: Utc::now(),
            })
            .await;
        assert!(matches!(stale, Err(RepositoryError::VersionConflict { .. })));

        pool.close().await;
    }
}
