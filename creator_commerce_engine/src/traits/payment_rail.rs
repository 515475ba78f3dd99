use ccg_common::EurCents;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The external service that moves money to a creator's bank account.
///
/// Implementations must pass `reference` through as the rail-side idempotency key so the rail
/// deduplicates retried requests, and must bound every call with a timeout. The engine treats
/// a timeout as an *unknown* outcome, never as success or failure.
#[allow(async_fn_in_trait)]
pub trait PaymentRail: Clone {
    async fn send_transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PaymentRailError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Idempotency key for the rail. Stable across retries of the same payout item.
    pub reference: String,
    /// Destination account (IBAN).
    pub destination: String,
    pub amount: EurCents,
    pub currency: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: String,
}

#[derive(Debug, Clone, Error)]
pub enum PaymentRailError {
    /// Worth retrying: timeouts at the HTTP layer, 5xx, connection resets.
    #[error("Transient payment rail error: {0}")]
    Transient(String),
    /// Not worth retrying: invalid destination, rejected mandate, 4xx.
    #[error("Permanent payment rail error: {0}")]
    Permanent(String),
    /// The call timed out with the outcome unknown. The caller must not assume either result.
    #[error("Payment rail call timed out: {0}")]
    Timeout(String),
}

impl PaymentRailError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, PaymentRailError::Permanent(_))
    }

    pub fn is_unknown_outcome(&self) -> bool {
        matches!(self, PaymentRailError::Timeout(_))
    }
}
