//! Shared helpers for the engine integration tests.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use ccg_common::{CommissionRate, EurCents};
use chrono::Utc;
use creator_commerce_engine::{
    db_types::{Creator, NewCreator, NewOrder, OrderId},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{CommerceDatabase, PaymentRail, PaymentRailError, TransferReceipt, TransferRequest},
    SqliteDatabase,
};

pub async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn seed_creator(db: &SqliteDatabase, name: &str, code: &str, rate_bps: i64) -> Creator {
    let rate = CommissionRate::from_basis_points(rate_bps).expect("invalid rate");
    let creator = NewCreator::new(name.to_string(), format!("{}@example.com", name.to_lowercase()), code.to_string(), rate)
        .with_bank_account("DE89370400440532013000", true);
    db.insert_creator(creator).await.expect("Error inserting creator")
}

pub fn paid_order(order_id: &str, subtotal: i64, total: i64) -> NewOrder {
    NewOrder::new(OrderId::from(order_id.to_string()), EurCents::from(subtotal), EurCents::from(total), Utc::now())
}

/// A scripted payment rail. Outcomes are keyed by the transfer reference; unscripted calls
/// succeed. Every call is recorded so tests can assert nothing was double-sent.
#[derive(Clone, Default)]
pub struct TestRail {
    calls: Arc<Mutex<Vec<String>>>,
    outcomes: Arc<Mutex<HashMap<String, Vec<PaymentRailError>>>>,
    delay: Option<std::time::Duration>,
}

impl TestRail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call take `delay` before answering, to drive timeout paths.
    pub fn with_delay(delay: std::time::Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    /// Scripts the next outcomes for `reference`; once drained, calls succeed.
    pub fn script(&self, reference: &str, errors: Vec<PaymentRailError>) {
        self.outcomes.lock().unwrap().insert(reference.to_string(), errors);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl PaymentRail for TestRail {
    async fn send_transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PaymentRailError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(request.reference.clone());
        let next = {
            let mut outcomes = self.outcomes.lock().unwrap();
            outcomes.get_mut(&request.reference).and_then(|errors| if errors.is_empty() { None } else { Some(errors.remove(0)) })
        };
        match next {
            Some(error) => Err(error),
            None => Ok(TransferReceipt { transfer_id: format!("tr_{}", request.reference) }),
        }
    }
}
