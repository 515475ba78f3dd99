use sqlx::SqliteConnection;

use crate::db_types::CheckoutSession;

/// The checkout flow records the last creator a cart was linked to; a later write for the
/// same cart token replaces the earlier one.
pub async fn upsert_session(
    cart_token: &str,
    creator_id: i64,
    routine_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<CheckoutSession, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO checkout_sessions (cart_token, creator_id, routine_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_token) DO UPDATE SET creator_id = excluded.creator_id, routine_id = excluded.routine_id
            RETURNING *;
        "#,
    )
    .bind(cart_token)
    .bind(creator_id)
    .bind(routine_id)
    .fetch_one(conn)
    .await
}

pub async fn fetch_session(cart_token: &str, conn: &mut SqliteConnection) -> Result<Option<CheckoutSession>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM checkout_sessions WHERE cart_token = $1").bind(cart_token).fetch_optional(conn).await
}
