use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use procura_core::directory::{DirectoryError, SupplierDirectory};
use procura_core::domain::supplier::{SupplierId, SupplierProfile};

use super::RepositoryError;
use crate::DbPool;

/// Supplier directory backed by the `supplier` table.
pub struct SqlSupplierDirectory {
    pool: DbPool,
}

impl SqlSupplierDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, supplier: &SupplierProfile) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO supplier (id, company_name, rating, delivery_score)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 company_name = excluded.company_name,
                 rating = excluded.rating,
                 delivery_score = excluded.delivery_score",
        )
        .bind(&supplier.id.0)
        .bind(&supplier.company_name)
        .bind(supplier.rating)
        .bind(supplier.delivery_score)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find(&self, id: &SupplierId) -> Result<Option<SupplierProfile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, company_name, rating, delivery_score FROM supplier WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(supplier_from_row).transpose()
    }
}

#[async_trait]
impl SupplierDirectory for SqlSupplierDirectory {
    async fn find_supplier(
        &self,
        id: &SupplierId,
    ) -> Result<Option<SupplierProfile>, DirectoryError> {
        self.find(id).await.map_err(|error| match error {
            RepositoryError::Decode(message) => DirectoryError::Malformed(message),
            other => DirectoryError::Unavailable(other.to_string()),
        })
    }
}

fn supplier_from_row(row: SqliteRow) -> Result<SupplierProfile, RepositoryError> {
    Ok(SupplierProfile {
        id: SupplierId(row.try_get("id")?),
        company_name: row.try_get("company_name")?,
        rating: row.try_get("rating")?,
        delivery_score: row.try_get("delivery_score")?,
    })
}
