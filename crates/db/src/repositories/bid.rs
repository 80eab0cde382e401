use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use procura_core::domain::bid::{Bid, BidId, BidStatus};
use procura_core::domain::request::RequestId;
use procura_core::domain::supplier::SupplierId;

use super::{parse_money, parse_timestamp, parse_u32, RepositoryError};
use crate::DbPool;

const BID_COLUMNS: &str = "id, request_id, supplier_id, bid_amount, delivery_time_days, proposal,
                           status, submitted_at";

pub(crate) async fn find(pool: &DbPool, id: &BidId) -> Result<Option<Bid>, RepositoryError> {
    let row = sqlx::query(&format!("SELECT {BID_COLUMNS} FROM bid WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(pool)
        .await?;

    row.map(bid_from_row).transpose()
}

pub(crate) async fn list_for_request(
    pool: &DbPool,
    request_id: &RequestId,
) -> Result<Vec<Bid>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT {BID_COLUMNS} FROM bid WHERE request_id = ? ORDER BY submitted_at ASC, id ASC"
    ))
    .bind(&request_id.0)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(bid_from_row).collect()
}

/// Inserts the bid in the same statement that checks the request is still
/// `approved`. Returns the number of rows written (0 or 1).
pub(crate) async fn insert_if_request_approved(
    pool: &DbPool,
    bid: &Bid,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "INSERT INTO bid (id, request_id, supplier_id, bid_amount, delivery_time_days, proposal,
                          status, submitted_at)
         SELECT ?, ?, ?, ?, ?, ?, ?, ?
         WHERE EXISTS (
             SELECT 1 FROM purchase_request WHERE id = ? AND status = 'approved'
         )",
    )
    .bind(&bid.id.0)
    .bind(&bid.request_id.0)
    .bind(&bid.supplier_id.0)
    .bind(bid.bid_amount.to_string())
    .bind(i64::from(bid.delivery_time_days))
    .bind(&bid.proposal)
    .bind(bid.status.as_str())
    .bind(super::request::format_timestamp(&bid.submitted_at))
    .bind(&bid.request_id.0)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Marks the winner `selected` and every other open bid of the request
/// `rejected`. Must run inside the award transaction.
pub(crate) async fn settle_award(
    conn: &mut SqliteConnection,
    request_id: &RequestId,
    winning_bid_id: &BidId,
) -> Result<(), RepositoryError> {
    let selected = sqlx::query(
        "UPDATE bid SET status = 'selected'
         WHERE id = ? AND request_id = ? AND status = 'submitted'",
    )
    .bind(&winning_bid_id.0)
    .bind(&request_id.0)
    .execute(&mut *conn)
    .await?;

    if selected.rows_affected() == 0 {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM bid WHERE id = ? AND request_id = ?")
                .bind(&winning_bid_id.0)
                .bind(&request_id.0)
                .fetch_optional(&mut *conn)
                .await?;
        return Err(match status {
            Some(_) => RepositoryError::BidClosed { bid_id: winning_bid_id.clone() },
            None => RepositoryError::not_found(
                procura_core::errors::EntityKind::Bid,
                winning_bid_id.0.clone(),
            ),
        });
    }

    sqlx::query(
        "UPDATE bid SET status = 'rejected'
         WHERE request_id = ? AND status = 'submitted' AND id <> ?",
    )
    .bind(&request_id.0)
    .bind(&winning_bid_id.0)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn bid_from_row(row: SqliteRow) -> Result<Bid, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = BidStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown bid status `{status_raw}`")))?;

    Ok(Bid {
        id: BidId(row.try_get("id")?),
        request_id: RequestId(row.try_get("request_id")?),
        supplier_id: SupplierId(row.try_get("supplier_id")?),
        bid_amount: parse_money("bid_amount", row.try_get("bid_amount")?)?,
        delivery_time_days: parse_u32("delivery_time_days", row.try_get("delivery_time_days")?)?,
        proposal: row.try_get("proposal")?,
        status,
        submitted_at: parse_timestamp("submitted_at", row.try_get("submitted_at")?)?,
    })
}
