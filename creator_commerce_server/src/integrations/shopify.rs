use ccg_common::EUR_CURRENCY_CODE;
use chrono::{DateTime, Utc};
use creator_commerce_engine::{
    db_types::{NewOrder, OrderId},
    helpers::parse_price,
};
use log::*;
use thiserror::Error;

use crate::shopify_order::ShopifyOrder;

#[derive(Debug, Error)]
pub enum OrderConversionError {
    #[error("The order payload contained invalid data. {0}")]
    FormatError(String),
    #[error("{0} is not a supported currency.")]
    UnsupportedCurrency(String),
}

/// Converts the platform payload into the engine's order event. The numeric platform id is
/// the natural key; the attribution signals (note attributes, cart token, discount code) are
/// carried along for the resolver.
pub fn new_order_from_shopify_order(value: ShopifyOrder) -> Result<NewOrder, OrderConversionError> {
    trace!("Converting ShopifyOrder to NewOrder: {:?}", value);
    let currency = value.currency.to_uppercase();
    if currency != EUR_CURRENCY_CODE {
        return Err(OrderConversionError::UnsupportedCurrency(value.currency));
    }
    let subtotal = parse_price(&value.subtotal_price).map_err(|e| OrderConversionError::FormatError(e.to_string()))?;
    let total = parse_price(&value.total_price).map_err(|e| OrderConversionError::FormatError(e.to_string()))?;
    let ordered_at =
        value.created_at.parse::<DateTime<Utc>>().map_err(|e| OrderConversionError::FormatError(e.to_string()))?;

    let note_creator_id = parse_note_id(&value, "creator_id");
    let note_routine_id = parse_note_id(&value, "routine_id");
    let discount_code = value.discount_codes.first().map(|d| d.code.clone());
    let cart_token = value.cart_token.clone().or_else(|| value.checkout_token.clone());
    let customer_email = value.customer.as_ref().and_then(|c| c.email.clone()).or_else(|| value.email.clone());

    let mut order = NewOrder::new(OrderId(value.id.to_string()), subtotal, total, ordered_at)
        .with_note_attributes(note_creator_id, note_routine_id);
    order.order_number = Some(value.name);
    order.customer_email = customer_email;
    order.discount_code = discount_code;
    order.cart_token = cart_token;
    Ok(order)
}

fn parse_note_id(order: &ShopifyOrder, name: &str) -> Option<i64> {
    let raw = order.note_attribute(name)?;
    match raw.parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("🛍️ Order {} carries a non-numeric {name} note attribute: {raw:?}. Ignoring it.", order.id);
            None
        },
    }
}

#[cfg(test)]
mod test {
    use ccg_common::EurCents;

    use super::*;
    use crate::shopify_order::{DiscountCode, NoteAttribute};

    fn payload() -> ShopifyOrder {
        ShopifyOrder {
            id: 1001,
            name: "#1001".to_string(),
            created_at: "2026-07-01T10:30:00Z".to_string(),
            currency: "EUR".to_string(),
            subtotal_price: "100.00".to_string(),
            total_price: "110.00".to_string(),
            cart_token: Some("cart-abc".to_string()),
            discount_codes: vec![DiscountCode { code: "EMMA15".to_string(), amount: None, kind: None }],
            note_attributes: vec![
                NoteAttribute { name: "creator_id".to_string(), value: "7".to_string() },
                NoteAttribute { name: "routine_id".to_string(), value: "42".to_string() },
            ],
            ..ShopifyOrder::default()
        }
    }

    #[test]
    fn converts_a_full_payload() {
        let order = new_order_from_shopify_order(payload()).unwrap();
        assert_eq!(order.order_id.as_str(), "1001");
        assert_eq!(order.order_number.as_deref(), Some("#1001"));
        assert_eq!(order.subtotal, EurCents::from(10_000));
        assert_eq!(order.total, EurCents::from(11_000));
        assert_eq!(order.discount_code.as_deref(), Some("EMMA15"));
        assert_eq!(order.cart_token.as_deref(), Some("cart-abc"));
        assert_eq!(order.note_creator_id, Some(7));
        assert_eq!(order.note_routine_id, Some(42));
    }

    #[test]
    fn rejects_foreign_currency() {
        let mut payload = payload();
        payload.currency = "USD".to_string();
        let err = new_order_from_shopify_order(payload).unwrap_err();
        assert!(matches!(err, OrderConversionError::UnsupportedCurrency(_)));
    }

    #[test]
    fn rejects_malformed_prices_and_dates() {
        let mut bad_price = payload();
        bad_price.subtotal_price = "a lot".to_string();
        assert!(matches!(new_order_from_shopify_order(bad_price), Err(OrderConversionError::FormatError(_))));

        let mut bad_date = payload();
        bad_date.created_at = "yesterday".to_string();
        assert!(matches!(new_order_from_shopify_order(bad_date), Err(OrderConversionError::FormatError(_))));
    }

    #[test]
    fn non_numeric_note_attributes_are_ignored() {
        let mut payload = payload();
        payload.note_attributes = vec![NoteAttribute { name: "creator_id".to_string(), value: "emma".to_string() }];
        let order = new_order_from_shopify_order(payload).unwrap();
        assert_eq!(order.note_creator_id, None);
    }
}
