use thiserror::Error;

use crate::db_types::{CheckoutSession, Creator};

/// Read access to the attribution signals: creators (by id and by discount code) and the
/// checkout-session table populated by the storefront's checkout flow.
#[allow(async_fn_in_trait)]
pub trait AttributionStore: Clone {
    async fn fetch_creator(&self, creator_id: i64) -> Result<Option<Creator>, AttributionError>;

    /// Discount codes are unique per creator and matched case-insensitively.
    async fn fetch_creator_by_discount_code(&self, code: &str) -> Result<Option<Creator>, AttributionError>;

    async fn fetch_checkout_session(&self, cart_token: &str) -> Result<Option<CheckoutSession>, AttributionError>;
}

#[derive(Debug, Clone, Error)]
pub enum AttributionError {
    #[error("Internal database error during attribution lookup: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for AttributionError {
    fn from(e: sqlx::Error) -> Self {
        AttributionError::DatabaseError(e.to_string())
    }
}
