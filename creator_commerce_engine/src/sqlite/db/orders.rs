use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Attribution, NewOrder, Order, OrderId, OrderStatusType},
    traits::CommerceError,
};

/// Insert-or-update the order keyed by the external order id. Returns the stored row and
/// `true` if it was inserted.
///
/// Update rules: payload fields are refreshed, attribution is only ever filled in (the first
/// resolution wins), the status never moves backward from `Confirmed` to `Pending`, and
/// orders in a terminal status are returned untouched.
pub async fn upsert_order(
    order: &NewOrder,
    status: OrderStatusType,
    attribution: Option<&Attribution>,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), CommerceError> {
    match fetch_order_by_order_id(&order.order_id, &mut *conn).await? {
        None => {
            let inserted = insert_order(order, status, attribution, conn).await?;
            debug!("📝️ Order {} inserted with id {}", inserted.order_id, inserted.id);
            Ok((inserted, true))
        },
        Some(existing) if existing.status.is_terminal() => {
            debug!("📝️ Order {} is {} and will not be modified by an upsert", existing.order_id, existing.status);
            Ok((existing, false))
        },
        Some(existing) => {
            let status = match (existing.status, status) {
                (OrderStatusType::Confirmed, OrderStatusType::Pending) => OrderStatusType::Confirmed,
                (_, new) => new,
            };
            let updated = update_order(&existing, order, status, attribution, conn).await?;
            debug!("📝️ Order {} updated (status {})", updated.order_id, updated.status);
            Ok((updated, false))
        },
    }
}

async fn insert_order(
    order: &NewOrder,
    status: OrderStatusType,
    attribution: Option<&Attribution>,
    conn: &mut SqliteConnection,
) -> Result<Order, CommerceError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                order_number,
                customer_email,
                subtotal,
                total,
                currency,
                discount_code,
                cart_token,
                creator_id,
                routine_id,
                attribution_source,
                status,
                ordered_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(order.order_number.as_deref())
    .bind(order.customer_email.as_deref())
    .bind(order.subtotal)
    .bind(order.total)
    .bind(order.currency.as_str())
    .bind(order.discount_code.as_deref())
    .bind(order.cart_token.as_deref())
    .bind(attribution.map(|a| a.creator_id))
    .bind(attribution.and_then(|a| a.routine_id))
    .bind(attribution.map(|a| a.source.to_string()))
    .bind(status.to_string())
    .bind(order.ordered_at)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

async fn update_order(
    existing: &Order,
    order: &NewOrder,
    status: OrderStatusType,
    attribution: Option<&Attribution>,
    conn: &mut SqliteConnection,
) -> Result<Order, CommerceError> {
    let result: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                order_number = COALESCE($2, order_number),
                customer_email = COALESCE($3, customer_email),
                subtotal = $4,
                total = $5,
                discount_code = COALESCE($6, discount_code),
                cart_token = COALESCE($7, cart_token),
                creator_id = COALESCE(creator_id, $8),
                routine_id = COALESCE(routine_id, $9),
                attribution_source = COALESCE(attribution_source, $10),
                status = $11,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(order.order_number.as_deref())
    .bind(order.customer_email.as_deref())
    .bind(order.subtotal)
    .bind(order.total)
    .bind(order.discount_code.as_deref())
    .bind(order.cart_token.as_deref())
    .bind(attribution.map(|a| a.creator_id))
    .bind(attribution.and_then(|a| a.routine_id))
    .bind(attribution.map(|a| a.source.to_string()))
    .bind(status.to_string())
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| CommerceError::OrderNotFound(existing.order_id.clone()))
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await
}

/// Moves an order to `Refunded` or `Canceled`. Already-annulled orders are a no-op that
/// returns the stored row, so a redelivered refund webhook stays idempotent.
pub async fn annul_order(
    order_id: &OrderId,
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, CommerceError> {
    let existing = fetch_order_by_order_id(order_id, &mut *conn)
        .await?
        .ok_or_else(|| CommerceError::OrderNotFound(order_id.clone()))?;
    if existing.status.is_terminal() {
        return Ok(existing);
    }
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 RETURNING *")
            .bind(new_status.to_string())
            .bind(order_id.as_str())
            .fetch_optional(conn)
            .await?;
    result.ok_or_else(|| CommerceError::OrderNotFound(order_id.clone()))
}
