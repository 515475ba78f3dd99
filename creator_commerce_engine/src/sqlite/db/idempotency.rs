use log::{debug, trace, warn};
use sqlx::SqliteConnection;

use crate::{
    db_types::{IdempotencyCheck, IdempotencyRecord, IdempotencyStatus},
    traits::IdempotencyError,
};

/// Tries to acquire the key with an atomic insert-if-absent. Exactly one of two racing
/// callers gets `New`; the loser observes whatever state the winner left behind.
///
/// A `Failed` record is reset to `Processing` and handed to the caller as a retry; `Processing`
/// and `Completed` records are reported as-is.
pub async fn acquire(
    operation: &str,
    natural_key: &str,
    conn: &mut SqliteConnection,
) -> Result<IdempotencyCheck, IdempotencyError> {
    let inserted = sqlx::query(
        "INSERT INTO idempotency_keys (operation, natural_key, status) VALUES ($1, $2, 'Processing') \
         ON CONFLICT (operation, natural_key) DO NOTHING",
    )
    .bind(operation)
    .bind(natural_key)
    .execute(&mut *conn)
    .await?;
    if inserted.rows_affected() == 1 {
        trace!("🔁️ Idempotency key {operation}:{natural_key} acquired");
        return Ok(IdempotencyCheck::New);
    }
    let record = fetch(operation, natural_key, &mut *conn).await?.ok_or_else(|| {
        // The row lost a race with a concurrent delete; nothing deletes keys, so this is a bug.
        IdempotencyError::DatabaseError(format!("Key {operation}:{natural_key} vanished after a conflict"))
    })?;
    match record.status {
        IdempotencyStatus::Processing => {
            debug!("🔁️ Operation {operation}:{natural_key} is already in flight");
            Ok(IdempotencyCheck::InFlight)
        },
        IdempotencyStatus::Completed => {
            let raw = record.response.unwrap_or_else(|| "null".to_string());
            let response = serde_json::from_str(&raw).map_err(|e| {
                IdempotencyError::CorruptResponse(format!("{operation}:{natural_key}"), e.to_string())
            })?;
            debug!("🔁️ Operation {operation}:{natural_key} already completed. Returning the cached response.");
            Ok(IdempotencyCheck::Completed(response))
        },
        IdempotencyStatus::Failed => {
            // Reclaim the key. The WHERE guard means only one of several racing retries wins.
            let reclaimed = sqlx::query(
                "UPDATE idempotency_keys SET status = 'Processing', error = NULL, updated_at = CURRENT_TIMESTAMP \
                 WHERE operation = $1 AND natural_key = $2 AND status = 'Failed'",
            )
            .bind(operation)
            .bind(natural_key)
            .execute(conn)
            .await?;
            if reclaimed.rows_affected() == 1 {
                let error = record.error.unwrap_or_default();
                warn!("🔁️ Retrying previously failed operation {operation}:{natural_key}. Last error: {error}");
                Ok(IdempotencyCheck::RetryAfterFailure(error))
            } else {
                debug!("🔁️ Lost the retry race for {operation}:{natural_key}");
                Ok(IdempotencyCheck::InFlight)
            }
        },
    }
}

pub async fn complete(
    operation: &str,
    natural_key: &str,
    response: &serde_json::Value,
    conn: &mut SqliteConnection,
) -> Result<(), IdempotencyError> {
    sqlx::query(
        "UPDATE idempotency_keys SET status = 'Completed', response = $3, error = NULL, \
         updated_at = CURRENT_TIMESTAMP WHERE operation = $1 AND natural_key = $2",
    )
    .bind(operation)
    .bind(natural_key)
    .bind(response.to_string())
    .execute(conn)
    .await?;
    trace!("🔁️ Operation {operation}:{natural_key} completed");
    Ok(())
}

pub async fn fail(
    operation: &str,
    natural_key: &str,
    error: &str,
    conn: &mut SqliteConnection,
) -> Result<(), IdempotencyError> {
    sqlx::query(
        "UPDATE idempotency_keys SET status = 'Failed', error = $3, updated_at = CURRENT_TIMESTAMP \
         WHERE operation = $1 AND natural_key = $2",
    )
    .bind(operation)
    .bind(natural_key)
    .bind(error)
    .execute(conn)
    .await?;
    debug!("🔁️ Operation {operation}:{natural_key} marked as failed: {error}");
    Ok(())
}

pub async fn fetch(
    operation: &str,
    natural_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<IdempotencyRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM idempotency_keys WHERE operation = $1 AND natural_key = $2")
        .bind(operation)
        .bind(natural_key)
        .fetch_optional(conn)
        .await
}
