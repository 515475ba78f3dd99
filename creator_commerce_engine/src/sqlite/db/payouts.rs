use ccg_common::EurCents;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{BatchStatus, Commission, ItemStatus, PayoutBatch, PayoutItem},
    traits::PayoutError,
};

pub async fn insert_batch(conn: &mut SqliteConnection) -> Result<PayoutBatch, PayoutError> {
    let batch: PayoutBatch =
        sqlx::query_as("INSERT INTO payout_batches (status) VALUES ('Draft') RETURNING *").fetch_one(conn).await?;
    debug!("💸️ Payout batch #{} created", batch.id);
    Ok(batch)
}

/// The draft selection: `Payable` commissions whose creator is active, bank-verified and has
/// an unfrozen ledger, excluding commissions already claimed by a live item of another batch
/// (a `Pending`/`Processing` item blocks re-selection; `Failed` and `Skipped` release it).
pub async fn select_payable_commissions(conn: &mut SqliteConnection) -> Result<Vec<Commission>, PayoutError> {
    let commissions = sqlx::query_as(
        r#"
            SELECT commissions.*
            FROM commissions
            JOIN creators ON creators.id = commissions.creator_id
            WHERE commissions.status = 'Payable'
              AND creators.status = 'Active'
              AND creators.bank_verified = 1
              AND creators.ledger_frozen = 0
              AND creators.iban IS NOT NULL
              AND commissions.id NOT IN (
                  SELECT commission_id FROM payout_items WHERE status IN ('Pending', 'Processing')
              )
            ORDER BY commissions.id ASC
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(commissions)
}

pub async fn insert_item(
    batch_id: i64,
    commission: &Commission,
    fee: EurCents,
    conn: &mut SqliteConnection,
) -> Result<PayoutItem, PayoutError> {
    let net = commission.amount - fee;
    let item = sqlx::query_as(
        r#"
            INSERT INTO payout_items (batch_id, commission_id, creator_id, amount, fee, net_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(batch_id)
    .bind(commission.id)
    .bind(commission.creator_id)
    .bind(commission.amount)
    .bind(fee)
    .bind(net)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_batch(batch_id: i64, conn: &mut SqliteConnection) -> Result<Option<PayoutBatch>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payout_batches WHERE id = $1").bind(batch_id).fetch_optional(conn).await
}

pub async fn fetch_items(batch_id: i64, conn: &mut SqliteConnection) -> Result<Vec<PayoutItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payout_items WHERE batch_id = $1 ORDER BY id ASC").bind(batch_id).fetch_all(conn).await
}

pub async fn fetch_item(item_id: i64, conn: &mut SqliteConnection) -> Result<Option<PayoutItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payout_items WHERE id = $1").bind(item_id).fetch_optional(conn).await
}

pub async fn list_batches(conn: &mut SqliteConnection) -> Result<Vec<PayoutBatch>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payout_batches ORDER BY id DESC").fetch_all(conn).await
}

/// Guarded batch transition. The `WHERE status` clause makes each transition single-shot;
/// callers get the typed error with the actual status when the row has moved on.
pub async fn update_batch_status(
    batch_id: i64,
    from: BatchStatus,
    to: BatchStatus,
    conn: &mut SqliteConnection,
) -> Result<PayoutBatch, PayoutError> {
    let stamp = match to {
        BatchStatus::Approved => ", approved_at = CURRENT_TIMESTAMP",
        BatchStatus::Executing => ", executed_at = CURRENT_TIMESTAMP",
        _ => "",
    };
    let sql = format!(
        "UPDATE payout_batches SET status = $1, updated_at = CURRENT_TIMESTAMP{stamp} \
         WHERE id = $2 AND status = $3 RETURNING *"
    );
    let updated: Option<PayoutBatch> =
        sqlx::query_as(&sql).bind(to.to_string()).bind(batch_id).bind(from.to_string()).fetch_optional(&mut *conn).await?;
    match updated {
        Some(batch) => {
            trace!("💸️ Batch #{batch_id}: {from} -> {to}");
            Ok(batch)
        },
        None => {
            let actual = fetch_batch(batch_id, conn).await?.ok_or(PayoutError::BatchNotFound(batch_id))?;
            Err(PayoutError::BatchNotInStatus { batch_id, expected: from, actual: actual.status })
        },
    }
}

pub async fn mark_item_processing(item_id: i64, conn: &mut SqliteConnection) -> Result<PayoutItem, PayoutError> {
    let updated: Option<PayoutItem> = sqlx::query_as(
        "UPDATE payout_items SET status = 'Processing', updated_at = CURRENT_TIMESTAMP \
         WHERE id = $1 AND status = 'Pending' RETURNING *",
    )
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(item) => Ok(item),
        None => {
            fetch_item(item_id, conn).await?.ok_or(PayoutError::ItemNotFound(item_id))?;
            Err(PayoutError::ItemNotPending(item_id))
        },
    }
}

/// `Processing → Completed` with the rail's transfer id.
pub async fn complete_item(
    item_id: i64,
    transfer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<PayoutItem, PayoutError> {
    let updated: Option<PayoutItem> = sqlx::query_as(
        "UPDATE payout_items SET status = 'Completed', transfer_id = $2, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $1 AND status = 'Processing' RETURNING *",
    )
    .bind(item_id)
    .bind(transfer_id)
    .fetch_optional(&mut *conn)
    .await?;
    updated.ok_or(PayoutError::ItemNotFound(item_id))
}

pub async fn fail_item(item_id: i64, error: &str, conn: &mut SqliteConnection) -> Result<PayoutItem, PayoutError> {
    let updated: Option<PayoutItem> = sqlx::query_as(
        "UPDATE payout_items SET status = 'Failed', error = $2, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $1 AND status IN ('Pending', 'Processing') RETURNING *",
    )
    .bind(item_id)
    .bind(error)
    .fetch_optional(&mut *conn)
    .await?;
    updated.ok_or(PayoutError::ItemNotFound(item_id))
}

pub async fn skip_item(item_id: i64, reason: &str, conn: &mut SqliteConnection) -> Result<PayoutItem, PayoutError> {
    let updated: Option<PayoutItem> = sqlx::query_as(
        "UPDATE payout_items SET status = 'Skipped', error = $2, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $1 AND status = 'Pending' RETURNING *",
    )
    .bind(item_id)
    .bind(reason)
    .fetch_optional(&mut *conn)
    .await?;
    updated.ok_or(PayoutError::ItemNotFound(item_id))
}
