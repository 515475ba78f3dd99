use thiserror::Error;

use crate::db_types::{IdempotencyCheck, IdempotencyRecord};

/// The idempotency gate. Every side-effecting operation that can be redelivered (webhook
/// events, batch execution requests, per-item transfers) runs behind a key acquired here.
///
/// Acquisition must be atomic insert-if-absent: when two redeliveries race, exactly one
/// observes [`IdempotencyCheck::New`] and proceeds; the other observes `InFlight` or
/// `Completed` and backs off. A key left in `Processing` by a crashed worker is deliberately
/// *not* reclaimed here; redelivery semantics decide whether the whole operation is retried.
#[allow(async_fn_in_trait)]
pub trait IdempotencyManagement: Clone {
    async fn acquire_idempotency_key(
        &self,
        operation: &str,
        natural_key: &str,
    ) -> Result<IdempotencyCheck, IdempotencyError>;

    /// Marks the key `Completed` and caches the response for replays.
    async fn complete_idempotency_key(
        &self,
        operation: &str,
        natural_key: &str,
        response: &serde_json::Value,
    ) -> Result<(), IdempotencyError>;

    /// Marks the key `Failed` with the error message, so the next acquisition is offered a
    /// retry rather than treated as a fresh operation.
    async fn fail_idempotency_key(
        &self,
        operation: &str,
        natural_key: &str,
        error: &str,
    ) -> Result<(), IdempotencyError>;

    async fn fetch_idempotency_record(
        &self,
        operation: &str,
        natural_key: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyError>;
}

#[derive(Debug, Clone, Error)]
pub enum IdempotencyError {
    #[error("Internal database error in the idempotency store: {0}")]
    DatabaseError(String),
    #[error("The cached response for {0} is not valid JSON: {1}")]
    CorruptResponse(String, String),
}

impl From<sqlx::Error> for IdempotencyError {
    fn from(e: sqlx::Error) -> Self {
        IdempotencyError::DatabaseError(e.to_string())
    }
}
