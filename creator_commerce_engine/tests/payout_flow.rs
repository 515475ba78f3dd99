mod support;

use std::time::Duration;

use ccg_common::EurCents;
use creator_commerce_engine::{
    db_types::{BatchStatus, CommissionStatus, ItemStatus, LedgerEntryType, OrderId},
    events::EventProducers,
    traits::{CommerceDatabase, LedgerManagement, Pagination, PaymentRailError, PayoutError, PayoutManagement},
    CommissionPolicy,
    ExecuteOutcome,
    OrderFlowApi,
    PayoutApi,
    PayoutPolicy,
    SqliteDatabase,
};
use support::{new_test_db, paid_order, seed_creator, TestRail};

fn policy() -> PayoutPolicy {
    PayoutPolicy { fee_per_transfer: EurCents::from(35), rail_timeout: Duration::from_secs(5), max_transient_attempts: 3 }
}

fn payout_api(db: &SqliteDatabase, rail: &TestRail) -> PayoutApi<SqliteDatabase, TestRail> {
    PayoutApi::new(db.clone(), rail.clone(), EventProducers::default(), policy())
}

/// Books one payable commission per (order, code) pair. Default policy has no maturity hold,
/// so commissions land directly in `Payable`.
async fn book_commissions(db: &SqliteDatabase, orders: &[(&str, i64, &str)]) {
    let api = OrderFlowApi::new(db.clone(), EventProducers::default(), CommissionPolicy::default());
    for (order_id, subtotal, code) in orders {
        let order = paid_order(order_id, *subtotal, *subtotal).with_discount_code(*code);
        api.process_order_paid(order).await.expect("Error processing order");
    }
}

#[tokio::test]
async fn batch_lifecycle_pays_out_and_zeroes_the_balances() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    let noah = seed_creator(&db, "Noah", "NOAH10", 1000).await;
    book_commissions(&db, &[("1001", 10_000, "EMMA15"), ("1002", 20_000, "NOAH10")]).await;

    let rail = TestRail::new();
    let api = payout_api(&db, &rail);

    let (batch, items) = api.create_batch().await.unwrap();
    assert_eq!(batch.status, BatchStatus::Draft);
    assert_eq!(items.len(), 2);
    // 15.00 - 0.35 fee
    assert_eq!(items[0].amount, EurCents::from(1_500));
    assert_eq!(items[0].net_amount, EurCents::from(1_465));

    let batch = api.approve_batch(batch.id).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Approved);

    let outcome = api.execute_batch(batch.id).await.unwrap();
    let report = match outcome {
        ExecuteOutcome::Executed(report) => report,
        other => panic!("Expected execution, got {other:?}"),
    };
    assert_eq!(report.settled.len(), 2);
    assert_eq!(report.final_status, Some(BatchStatus::Completed));
    assert_eq!(rail.call_count(), 2);

    let (batch, items) = api.batch(batch.id).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert!(items.iter().all(|i| i.status == ItemStatus::Completed && i.transfer_id.is_some()));

    // Earned +15.00, payout -14.65, fee -0.35: balance back to zero.
    assert_eq!(db.ledger_balance(emma.id).await.unwrap(), EurCents::from(0));
    assert_eq!(db.ledger_balance(noah.id).await.unwrap(), EurCents::from(0));
    let entries = db.ledger_entries(emma.id, Pagination::default()).await.unwrap();
    let types: Vec<_> = entries.iter().map(|e| e.entry_type).collect();
    assert_eq!(types, vec![LedgerEntryType::PayoutFee, LedgerEntryType::PayoutSent, LedgerEntryType::CommissionEarned]);

    let commission = db.fetch_commission_for_order(&OrderId::from("1001".to_string())).await.unwrap().unwrap();
    assert_eq!(commission.status, CommissionStatus::Paid);
}

#[tokio::test]
async fn re_executing_a_batch_never_double_sends() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    book_commissions(&db, &[("2001", 10_000, "EMMA15")]).await;

    let rail = TestRail::new();
    let api = payout_api(&db, &rail);
    let (batch, _) = api.create_batch().await.unwrap();
    api.approve_batch(batch.id).await.unwrap();
    api.execute_batch(batch.id).await.unwrap();
    assert_eq!(rail.call_count(), 1);

    // A retried execution request, e.g. after the caller timed out waiting for the first.
    let outcome = api.execute_batch(batch.id).await.unwrap();
    assert!(matches!(outcome, ExecuteOutcome::Replayed(_)), "the cached report must be replayed");
    assert_eq!(rail.call_count(), 1, "no second transfer may be sent");

    let entries = db.ledger_entries(emma.id, Pagination::default()).await.unwrap();
    let payouts = entries.iter().filter(|e| e.entry_type == LedgerEntryType::PayoutSent).count();
    assert_eq!(payouts, 1, "exactly one payout_sent entry");
}

#[tokio::test]
async fn permanent_failure_leaves_the_batch_partial_and_the_commission_payable() {
    let db = new_test_db().await;
    seed_creator(&db, "Emma", "EMMA15", 1500).await;
    let noah = seed_creator(&db, "Noah", "NOAH10", 1000).await;
    seed_creator(&db, "Lena", "LENA20", 2000).await;
    book_commissions(&db, &[("3001", 10_000, "EMMA15"), ("3002", 10_000, "NOAH10"), ("3003", 10_000, "LENA20")]).await;

    let rail = TestRail::new();
    let api = payout_api(&db, &rail);
    let (batch, items) = api.create_batch().await.unwrap();
    assert_eq!(items.len(), 3);
    let noah_item = items.iter().find(|i| i.creator_id == noah.id).unwrap();
    rail.script(
        &format!("payout_item_{}", noah_item.id),
        vec![PaymentRailError::Permanent("Invalid destination account".to_string())],
    );

    api.approve_batch(batch.id).await.unwrap();
    let outcome = api.execute_batch(batch.id).await.unwrap();
    let report = match outcome {
        ExecuteOutcome::Executed(report) => report,
        other => panic!("Expected execution, got {other:?}"),
    };
    assert_eq!(report.settled.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.final_status, Some(BatchStatus::Partial));

    let (batch, items) = api.batch(batch.id).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Partial);
    let failed = items.iter().find(|i| i.creator_id == noah.id).unwrap();
    assert_eq!(failed.status, ItemStatus::Failed);
    // The failure reason is surfaced verbatim for remediation.
    assert_eq!(failed.error.as_deref(), Some("Permanent payment rail error: Invalid destination account"));

    // No money moved for the failed item, and its commission is eligible again.
    assert_eq!(db.ledger_balance(noah.id).await.unwrap(), EurCents::from(1_000));
    let commission = db.fetch_commission_for_order(&OrderId::from("3002".to_string())).await.unwrap().unwrap();
    assert_eq!(commission.status, CommissionStatus::Payable);

    let (_, retry_items) = api.create_batch().await.unwrap();
    assert_eq!(retry_items.len(), 1);
    assert_eq!(retry_items[0].commission_id, failed.commission_id);
}

#[tokio::test]
async fn transient_errors_are_retried_within_the_pass() {
    let db = new_test_db().await;
    seed_creator(&db, "Emma", "EMMA15", 1500).await;
    book_commissions(&db, &[("4001", 10_000, "EMMA15")]).await;

    let rail = TestRail::new();
    let api = payout_api(&db, &rail);
    let (batch, items) = api.create_batch().await.unwrap();
    rail.script(
        &format!("payout_item_{}", items[0].id),
        vec![
            PaymentRailError::Transient("503 from the rail".to_string()),
            PaymentRailError::Transient("connection reset".to_string()),
        ],
    );
    api.approve_batch(batch.id).await.unwrap();
    let outcome = api.execute_batch(batch.id).await.unwrap();
    let report = match outcome {
        ExecuteOutcome::Executed(report) => report,
        other => panic!("Expected execution, got {other:?}"),
    };
    assert_eq!(report.settled.len(), 1);
    assert_eq!(rail.call_count(), 3, "two transient failures then success");
    assert_eq!(report.final_status, Some(BatchStatus::Completed));
}

#[tokio::test]
async fn approval_revalidates_commission_state() {
    let db = new_test_db().await;
    seed_creator(&db, "Emma", "EMMA15", 1500).await;
    book_commissions(&db, &[("5001", 10_000, "EMMA15")]).await;

    let rail = TestRail::new();
    let api = payout_api(&db, &rail);
    let (batch, _) = api.create_batch().await.unwrap();

    // The order is refunded between draft and approval; the commission is no longer payable.
    let flow = OrderFlowApi::new(db.clone(), EventProducers::default(), CommissionPolicy::default());
    flow.process_order_refunded(&OrderId::from("5001".to_string())).await.unwrap();

    let err = api.approve_batch(batch.id).await.expect_err("approval must re-validate");
    assert!(matches!(err, PayoutError::CommissionNotPayable { .. }), "got {err}");
}

#[tokio::test]
async fn execution_requires_an_approved_batch() {
    let db = new_test_db().await;
    seed_creator(&db, "Emma", "EMMA15", 1500).await;
    book_commissions(&db, &[("6001", 10_000, "EMMA15")]).await;

    let rail = TestRail::new();
    let api = payout_api(&db, &rail);
    let (batch, _) = api.create_batch().await.unwrap();
    let err = api.execute_batch(batch.id).await.expect_err("draft batches must not execute");
    assert!(matches!(err, PayoutError::BatchNotInStatus { .. }), "got {err}");
    assert_eq!(rail.call_count(), 0);

    // The failed attempt left a Failed execution key; after approval the retry goes through.
    api.approve_batch(batch.id).await.unwrap();
    let outcome = api.execute_batch(batch.id).await.unwrap();
    assert!(matches!(outcome, ExecuteOutcome::Executed(_)));
    assert_eq!(rail.call_count(), 1);
}

#[tokio::test]
async fn rail_timeout_leaves_the_item_unresolved_and_blocks_reselection() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    book_commissions(&db, &[("7001", 10_000, "EMMA15")]).await;

    let rail = TestRail::with_delay(Duration::from_millis(250));
    let short_timeout = PayoutPolicy { rail_timeout: Duration::from_millis(50), ..policy() };
    let api = PayoutApi::new(db.clone(), rail.clone(), EventProducers::default(), short_timeout);

    let (batch, items) = api.create_batch().await.unwrap();
    api.approve_batch(batch.id).await.unwrap();
    let outcome = api.execute_batch(batch.id).await.unwrap();
    let report = match outcome {
        ExecuteOutcome::Executed(report) => report,
        other => panic!("Expected execution, got {other:?}"),
    };
    assert_eq!(report.unknown, vec![items[0].id]);
    assert!(report.settled.is_empty());

    // Unknown outcome: the item stays Processing, no ledger entries, commission untouched.
    let (_, items) = db.fetch_payout_batch(batch.id).await.unwrap();
    assert_eq!(items[0].status, ItemStatus::Processing);
    assert_eq!(db.ledger_balance(emma.id).await.unwrap(), EurCents::from(1_500));
    let commission = db.fetch_commission_for_order(&OrderId::from("7001".to_string())).await.unwrap().unwrap();
    assert_eq!(commission.status, CommissionStatus::Payable);

    // The live item blocks the commission from being drafted into another batch.
    let err = api.create_batch().await.expect_err("commission is claimed by the unresolved item");
    assert!(matches!(err, PayoutError::NoPayableCommissions), "got {err}");
}
