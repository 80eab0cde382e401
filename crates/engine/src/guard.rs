use std::future::Future;
use std::time::Duration;

use procura_core::errors::{ApplicationError, DomainError};
use procura_db::RepositoryError;

/// Puts a caller-driven deadline on every ledger round trip.
#[derive(Clone, Copy, Debug)]
pub struct LedgerGuard {
    timeout: Duration,
}

impl Default for LedgerGuard {
    fn default() -> Self {
        Self { timeout: Duration::from_millis(5_000) }
    }
}

impl LedgerGuard {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `operation` and maps store failures with [`map_repository_error`].
    pub async fn call<T, F>(&self, operation: &'static str, future: F) -> Result<T, ApplicationError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        self.call_raw(operation, future).await?.map_err(map_repository_error)
    }

    /// Like [`LedgerGuard::call`] but hands store failures back untouched so
    /// the caller can give them operation-specific meaning.
    pub async fn call_raw<T, F>(
        &self,
        operation: &'static str,
        future: F,
    ) -> Result<Result<T, RepositoryError>, ApplicationError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        self.deadline(operation, future).await
    }

    /// Bounds any future by the ledger deadline without interpreting its
    /// output.
    pub async fn deadline<T, F>(
        &self,
        operation: &'static str,
        future: F,
    ) -> Result<T, ApplicationError>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.timeout, future).await.map_err(|_| {
            ApplicationError::Timeout(format!(
                "ledger {operation} did not complete within {}ms",
                self.timeout.as_millis()
            ))
        })
    }
}

pub fn map_repository_error(error: RepositoryError) -> ApplicationError {
    match error {
        RepositoryError::NotFound { entity, id } => DomainError::NotFound { entity, id }.into(),
        RepositoryError::VersionConflict { request_id, expected, actual } => {
            DomainError::Conflict { request_id, expected, actual }.into()
        }
        other => ApplicationError::Persistence(other.to_string()),
    }
}
