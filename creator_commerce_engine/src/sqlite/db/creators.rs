use ccg_common::CommissionRate;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Creator, CreatorStatus, NewCreator},
    traits::CommerceError,
};

pub async fn insert_creator(creator: NewCreator, conn: &mut SqliteConnection) -> Result<Creator, CommerceError> {
    let creator: Creator = sqlx::query_as(
        r#"
            INSERT INTO creators (name, email, discount_code, commission_rate, iban, bank_verified)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(creator.name)
    .bind(creator.email)
    .bind(creator.discount_code)
    .bind(creator.commission_rate)
    .bind(creator.iban)
    .bind(creator.bank_verified)
    .fetch_one(conn)
    .await?;
    debug!("🧑‍🎨️ Creator {} inserted with id {}", creator.name, creator.id);
    Ok(creator)
}

pub async fn fetch_creator(creator_id: i64, conn: &mut SqliteConnection) -> Result<Option<Creator>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM creators WHERE id = $1").bind(creator_id).fetch_optional(conn).await
}

/// Discount codes are stored with `COLLATE NOCASE`, so this match is case-insensitive.
pub async fn fetch_creator_by_discount_code(
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Creator>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM creators WHERE discount_code = $1").bind(code).fetch_optional(conn).await
}

pub async fn set_commission_rate(
    creator_id: i64,
    rate: CommissionRate,
    conn: &mut SqliteConnection,
) -> Result<Creator, CommerceError> {
    let result: Option<Creator> = sqlx::query_as(
        "UPDATE creators SET commission_rate = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(rate)
    .bind(creator_id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(CommerceError::CreatorNotFound(creator_id))
}

pub async fn set_status(
    creator_id: i64,
    status: CreatorStatus,
    conn: &mut SqliteConnection,
) -> Result<Creator, CommerceError> {
    let result: Option<Creator> =
        sqlx::query_as("UPDATE creators SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status.to_string())
            .bind(creator_id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(CommerceError::CreatorNotFound(creator_id))
}

/// Blocks all further ledger writes for the creator. Only a manual operator action (outside
/// this subsystem) unfreezes a ledger.
pub async fn freeze_ledger(creator_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE creators SET ledger_frozen = 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(creator_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn is_ledger_frozen(creator_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let frozen: Option<bool> =
        sqlx::query_scalar("SELECT ledger_frozen FROM creators WHERE id = $1").bind(creator_id).fetch_optional(conn).await?;
    Ok(frozen.unwrap_or(false))
}
