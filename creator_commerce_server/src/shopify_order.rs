use serde::{Deserialize, Serialize};

/// The order payload the platform posts to the webhook endpoints. Only the fields the
/// attribution and commission flow care about are modelled; everything else is ignored by
/// serde.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShopifyOrder {
    pub id: i64,
    /// Human-facing order number, e.g. "#1001".
    pub name: String,
    pub email: Option<String>,
    pub cart_token: Option<String>,
    pub checkout_token: Option<String>,
    pub created_at: String,
    pub currency: String,
    pub financial_status: Option<String>,
    /// Decimal strings, e.g. "100.00". The subtotal excludes shipping and tax and is the
    /// commission base.
    pub subtotal_price: String,
    pub total_price: String,
    #[serde(default)]
    pub note_attributes: Vec<NoteAttribute>,
    #[serde(default)]
    pub discount_codes: Vec<DiscountCode>,
    pub customer: Option<Customer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NoteAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscountCode {
    pub code: String,
    pub amount: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Customer {
    pub id: Option<i64>,
    pub email: Option<String>,
}

/// The refund payload. Only the order linkage matters to us.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShopifyRefund {
    pub id: i64,
    pub order_id: i64,
    pub created_at: Option<String>,
    pub note: Option<String>,
}

impl ShopifyOrder {
    pub fn note_attribute(&self, name: &str) -> Option<&str> {
        self.note_attributes.iter().find(|a| a.name == name).map(|a| a.value.as_str())
    }
}
