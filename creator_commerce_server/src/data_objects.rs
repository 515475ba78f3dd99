use std::fmt::Display;

use ccg_common::EurCents;
use creator_commerce_engine::db_types::{PayoutBatch, PayoutItem};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchView {
    pub batch: PayoutBatch,
    pub items: Vec<PayoutItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub creator_id: i64,
    pub balance: EurCents,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}
