use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewNotification, Notification},
    traits::{NotificationError, Pagination},
};

pub async fn insert(notification: NewNotification, conn: &mut SqliteConnection) -> Result<Notification, NotificationError> {
    let row: Notification = sqlx::query_as(
        r#"
            INSERT INTO notifications (creator_id, ledger_entry_id, kind, title, message, amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(notification.creator_id)
    .bind(notification.ledger_entry_id)
    .bind(notification.kind)
    .bind(notification.title)
    .bind(notification.message)
    .bind(notification.amount)
    .fetch_one(conn)
    .await?;
    debug!("📣️ Notification {} recorded for creator #{}", row.id, row.creator_id);
    Ok(row)
}

pub async fn for_creator(
    creator_id: i64,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<Notification>, NotificationError> {
    let rows = sqlx::query_as("SELECT * FROM notifications WHERE creator_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3")
        .bind(creator_id)
        .bind(i64::from(pagination.limit))
        .bind(pagination.offset())
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

/// Synthesizes a notification for every ledger entry that has none. The titles are generic;
/// this is a repair tool for gaps left by a partial outage, not the steady-state writer.
pub async fn backfill(conn: &mut SqliteConnection) -> Result<Vec<Notification>, NotificationError> {
    let rows: Vec<Notification> = sqlx::query_as(
        r#"
            INSERT INTO notifications (creator_id, ledger_entry_id, kind, title, message, amount)
            SELECT
                le.creator_id,
                le.id,
                'ledger.' || le.entry_type,
                'Ledger update',
                le.description,
                le.amount
            FROM ledger_entries le
            LEFT JOIN notifications n ON n.ledger_entry_id = le.id
            WHERE n.id IS NULL
            RETURNING *;
        "#,
    )
    .fetch_all(conn)
    .await?;
    debug!("📣️ Backfilled {} missing notifications", rows.len());
    Ok(rows)
}
