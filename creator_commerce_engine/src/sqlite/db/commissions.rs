use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Commission, CommissionStatus, NewCommission, OrderId},
    traits::CommerceError,
};

/// Inserts the commission unless one already exists for the order, returning `false` in the
/// second parameter if it did. The unique order id makes the window between fetch and insert
/// harmless: a racing insert fails on the constraint instead of duplicating.
pub async fn idempotent_insert(
    commission: NewCommission,
    status: CommissionStatus,
    conn: &mut SqliteConnection,
) -> Result<(Commission, bool), CommerceError> {
    let inserted = match fetch_commission_for_order(&commission.order_id, &mut *conn).await? {
        Some(existing) => (existing, false),
        None => {
            let commission = insert_commission(commission, status, conn).await?;
            debug!(
                "💶️ Commission of {} for order {} created with id {} ({})",
                commission.amount, commission.order_id, commission.id, commission.status
            );
            (commission, true)
        },
    };
    Ok(inserted)
}

async fn insert_commission(
    commission: NewCommission,
    status: CommissionStatus,
    conn: &mut SqliteConnection,
) -> Result<Commission, CommerceError> {
    let commission = sqlx::query_as(
        r#"
            INSERT INTO commissions (order_id, creator_id, order_subtotal, rate, amount, status, lock_until)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(commission.order_id.as_str())
    .bind(commission.creator_id)
    .bind(commission.order_subtotal)
    .bind(commission.rate)
    .bind(commission.amount)
    .bind(status.to_string())
    .bind(commission.lock_until)
    .fetch_one(conn)
    .await?;
    Ok(commission)
}

pub async fn fetch_commission_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Commission>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM commissions WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await
}

pub async fn fetch_commission(id: i64, conn: &mut SqliteConnection) -> Result<Option<Commission>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM commissions WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// Cancels the order's commission if it has one in a non-terminal state. Returns the
/// commission as it was *before* cancellation so the caller can decide whether an offsetting
/// ledger entry is due (only for previously `Paid` commissions).
pub async fn cancel_commission_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Commission>, CommerceError> {
    let existing = match fetch_commission_for_order(order_id, &mut *conn).await? {
        Some(c) => c,
        None => return Ok(None),
    };
    if existing.status == CommissionStatus::Canceled {
        return Ok(Some(existing));
    }
    sqlx::query("UPDATE commissions SET status = 'Canceled', updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(existing.id)
        .execute(conn)
        .await?;
    debug!("💶️ Commission {} for order {} cancelled (was {})", existing.id, order_id, existing.status);
    Ok(Some(existing))
}

/// Transitions one commission. The `WHERE status` guard keeps the state machine monotonic
/// under concurrency; a row that already moved on is simply not updated.
pub async fn update_commission_status(
    id: i64,
    from: CommissionStatus,
    to: CommissionStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Commission>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE commissions SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(to.to_string())
    .bind(id)
    .bind(from.to_string())
    .fetch_optional(conn)
    .await
}

/// The maturity sweep. Commissions inside their hold become `Locked`; commissions whose hold
/// has passed (or was never set) become `Payable`. Returns the released commissions.
pub async fn release_matured(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Commission>, CommerceError> {
    sqlx::query(
        "UPDATE commissions SET status = 'Locked', updated_at = CURRENT_TIMESTAMP \
         WHERE status = 'Pending' AND lock_until IS NOT NULL AND lock_until > $1",
    )
    .bind(now)
    .execute(&mut *conn)
    .await?;
    let released = sqlx::query_as(
        "UPDATE commissions SET status = 'Payable', updated_at = CURRENT_TIMESTAMP \
         WHERE status IN ('Pending', 'Locked') AND (lock_until IS NULL OR lock_until <= $1) RETURNING *",
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(released)
}
