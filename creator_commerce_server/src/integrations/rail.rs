//! HTTP client for the payment rail.
//!
//! The rail deduplicates on the `Idempotency-Key` header, so retried requests for the same
//! payout item can never produce two transfers on its side either. Error classification:
//! 5xx and connection errors are transient, request timeouts are an unknown outcome, and
//! everything else (4xx) is permanent and needs operator attention.

use creator_commerce_engine::traits::{PaymentRail, PaymentRailError, TransferReceipt, TransferRequest};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::{config::RailConfig, errors::ServerError};

#[derive(Clone)]
pub struct HttpPaymentRail {
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct TransferBody<'a> {
    destination_iban: &'a str,
    amount_cents: i64,
    currency: &'a str,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct RailTransferResponse {
    id: String,
}

impl HttpPaymentRail {
    pub fn new(config: &RailConfig) -> Result<Self, ServerError> {
        let mut headers = HeaderMap::with_capacity(2);
        let auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.reveal()))
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        headers.insert("Authorization", auth);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { base_url: config.base_url.trim_end_matches('/').to_string(), client })
    }
}

impl PaymentRail for HttpPaymentRail {
    async fn send_transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PaymentRailError> {
        let url = format!("{}/v1/transfers", self.base_url);
        let body = TransferBody {
            destination_iban: &request.destination,
            amount_cents: request.amount.value(),
            currency: &request.currency,
            description: &request.description,
        };
        trace!("🏦️ Sending transfer {} of {} to the rail", request.reference, request.amount);
        let response = self
            .client
            .post(&url)
            .header("Idempotency-Key", &request.reference)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaymentRailError::Timeout(e.to_string())
                } else {
                    PaymentRailError::Transient(e.to_string())
                }
            })?;
        let status = response.status();
        if status.is_success() {
            let receipt: RailTransferResponse =
                response.json().await.map_err(|e| PaymentRailError::Transient(e.to_string()))?;
            debug!("🏦️ Transfer {} accepted by the rail as {}", request.reference, receipt.id);
            return Ok(TransferReceipt { transfer_id: receipt.id });
        }
        let message = response.text().await.unwrap_or_else(|e| e.to_string());
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            Err(PaymentRailError::Transient(format!("{status}: {message}")))
        } else {
            Err(PaymentRailError::Permanent(format!("{status}: {message}")))
        }
    }
}
