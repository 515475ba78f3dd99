mod support;

use ccg_common::{CommissionRate, EurCents};
use chrono::{Duration, Utc};
use creator_commerce_engine::{
    db_types::{AttributionSource, CommissionStatus, LedgerEntryType, OrderId, OrderStatusType},
    events::EventProducers,
    traits::{CommerceDatabase, LedgerManagement, Pagination},
    CommissionPolicy,
    OrderFlowApi,
    OrderPaidResult,
};
use support::{new_test_db, paid_order, seed_creator};

fn flow_api(db: &creator_commerce_engine::SqliteDatabase) -> OrderFlowApi<creator_commerce_engine::SqliteDatabase> {
    OrderFlowApi::new(db.clone(), EventProducers::default(), CommissionPolicy::default())
}

#[tokio::test]
async fn discount_code_attribution_books_the_commission() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    let api = flow_api(&db);

    let order = paid_order("1001", 10_000, 11_000).with_discount_code("EMMA15");
    let result = api.process_order_paid(order).await.expect("Error processing order");
    let outcome = match result {
        OrderPaidResult::Processed(outcome) => outcome,
        other => panic!("Expected first delivery to be processed, got {other:?}"),
    };

    assert_eq!(outcome.order.status, OrderStatusType::Confirmed);
    assert_eq!(outcome.order.attribution_source, Some(AttributionSource::DiscountCode));
    let commission = outcome.commission.expect("commission should exist");
    assert_eq!(commission.creator_id, emma.id);
    assert_eq!(commission.amount, EurCents::from(1_500));
    assert_eq!(commission.rate, CommissionRate::from_basis_points(1500).unwrap());
    assert_eq!(commission.order_subtotal, EurCents::from(10_000));

    let balance = db.ledger_balance(emma.id).await.unwrap();
    assert_eq!(balance, EurCents::from(1_500));
    let entries = db.ledger_entries(emma.id, Pagination::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_type, LedgerEntryType::CommissionEarned);
    assert_eq!(entries[0].amount, EurCents::from(1_500));
    assert_eq!(entries[0].balance_after, EurCents::from(1_500));
}

#[tokio::test]
async fn replayed_webhook_creates_exactly_one_commission() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    let api = flow_api(&db);

    let order = paid_order("2001", 10_000, 11_000).with_discount_code("EMMA15");
    let first = api.process_order_paid(order.clone()).await.unwrap();
    assert!(matches!(first, OrderPaidResult::Processed(_)));

    // The platform redelivers the same event. Same payload, same natural key.
    let second = api.process_order_paid(order).await.unwrap();
    let replay = match second {
        OrderPaidResult::Replayed(response) => response,
        other => panic!("Expected a replay, got {other:?}"),
    };
    assert_eq!(replay["attributed"], serde_json::json!(true));

    let entries = db.ledger_entries(emma.id, Pagination::default()).await.unwrap();
    assert_eq!(entries.len(), 1, "replay must not append a second ledger entry");
    let commission = db.fetch_commission_for_order(&OrderId::from("2001".to_string())).await.unwrap();
    assert!(commission.is_some());
}

#[tokio::test]
async fn cart_attributes_win_over_another_creators_discount_code() {
    let db = new_test_db().await;
    let _emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    let noah = seed_creator(&db, "Noah", "NOAH10", 1000).await;
    let api = flow_api(&db);

    let order = paid_order("3001", 10_000, 10_000)
        .with_discount_code("EMMA15")
        .with_note_attributes(Some(noah.id), Some(42));
    let result = api.process_order_paid(order).await.unwrap();
    let outcome = match result {
        OrderPaidResult::Processed(outcome) => outcome,
        other => panic!("Expected processing, got {other:?}"),
    };
    let commission = outcome.commission.expect("commission should exist");
    assert_eq!(commission.creator_id, noah.id, "priority 3 must beat priority 1");
    assert_eq!(outcome.order.attribution_source, Some(AttributionSource::CartAttributes));
    assert_eq!(outcome.order.routine_id, Some(42));
    // Noah's rate, not Emma's.
    assert_eq!(commission.amount, EurCents::from(1_000));
}

#[tokio::test]
async fn unattributed_orders_are_confirmed_without_commission() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    let api = flow_api(&db);

    let result = api.process_order_paid(paid_order("4001", 5_000, 5_000)).await.unwrap();
    let outcome = match result {
        OrderPaidResult::Processed(outcome) => outcome,
        other => panic!("Expected processing, got {other:?}"),
    };
    assert!(outcome.commission.is_none());
    assert_eq!(outcome.order.status, OrderStatusType::Confirmed);
    assert_eq!(db.ledger_balance(emma.id).await.unwrap(), EurCents::from(0));
}

#[tokio::test]
async fn refund_cancels_an_unpaid_commission_without_touching_the_ledger() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    let api = flow_api(&db);

    let order = paid_order("5001", 10_000, 11_000).with_discount_code("EMMA15");
    api.process_order_paid(order).await.unwrap();

    let order_id = OrderId::from("5001".to_string());
    let outcome = api.process_order_refunded(&order_id).await.unwrap();
    assert_eq!(outcome.order.status, OrderStatusType::Refunded);
    let commission = outcome.commission.expect("commission should exist");
    assert_eq!(commission.status, CommissionStatus::Canceled);
    // The commission had not been paid out, so no offsetting entry is written.
    assert!(outcome.ledger_entry.is_none());
    let entries = db.ledger_entries(emma.id, Pagination::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(db.ledger_balance(emma.id).await.unwrap(), EurCents::from(1_500));

    // A redelivered refund changes nothing.
    let again = api.process_order_refunded(&order_id).await.unwrap();
    assert!(again.ledger_entry.is_none());
    assert_eq!(db.ledger_entries(emma.id, Pagination::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rate_changes_do_not_rewrite_existing_commissions() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    let api = flow_api(&db);

    let order = paid_order("6001", 10_000, 10_000).with_discount_code("EMMA15");
    api.process_order_paid(order).await.unwrap();

    db.set_creator_commission_rate(emma.id, CommissionRate::from_basis_points(2000).unwrap()).await.unwrap();

    let commission = db.fetch_commission_for_order(&OrderId::from("6001".to_string())).await.unwrap().unwrap();
    assert_eq!(commission.rate, CommissionRate::from_basis_points(1500).unwrap());
    assert_eq!(commission.amount, EurCents::from(1_500));

    // A new order after the change earns at the new rate.
    let order = paid_order("6002", 10_000, 10_000).with_discount_code("EMMA15");
    api.process_order_paid(order).await.unwrap();
    let commission = db.fetch_commission_for_order(&OrderId::from("6002".to_string())).await.unwrap().unwrap();
    assert_eq!(commission.amount, EurCents::from(2_000));
}

#[tokio::test]
async fn created_then_paid_upserts_a_single_order_row() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    let api = flow_api(&db);

    let order = paid_order("7001", 10_000, 10_000).with_discount_code("EMMA15");
    let (created, inserted) = api.process_order_created(order.clone()).await.unwrap();
    assert!(inserted);
    assert_eq!(created.status, OrderStatusType::Pending);
    assert_eq!(created.creator_id, Some(emma.id));
    // No commission on the created event.
    assert!(db.fetch_commission_for_order(&created.order_id).await.unwrap().is_none());

    api.process_order_paid(order).await.unwrap();
    let stored = db.fetch_order(&created.order_id).await.unwrap().unwrap();
    assert_eq!(stored.id, created.id, "the paid event must update, not duplicate, the row");
    assert_eq!(stored.status, OrderStatusType::Confirmed);
    assert!(db.fetch_commission_for_order(&created.order_id).await.unwrap().is_some());
}

#[tokio::test]
async fn maturity_hold_keeps_commissions_locked_until_the_window_passes() {
    let db = new_test_db().await;
    seed_creator(&db, "Emma", "EMMA15", 1500).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default(), CommissionPolicy::with_maturity_days(14));

    let order = paid_order("8001", 10_000, 10_000).with_discount_code("EMMA15");
    api.process_order_paid(order).await.unwrap();

    let order_id = OrderId::from("8001".to_string());
    let commission = db.fetch_commission_for_order(&order_id).await.unwrap().unwrap();
    assert_eq!(commission.status, CommissionStatus::Pending);
    assert!(commission.lock_until.is_some());

    // Inside the window: the sweep locks the commission but does not release it.
    let released = api.release_matured_commissions(Utc::now()).await.unwrap();
    assert!(released.is_empty());
    let commission = db.fetch_commission_for_order(&order_id).await.unwrap().unwrap();
    assert_eq!(commission.status, CommissionStatus::Locked);

    // After the window: released to Payable.
    let released = api.release_matured_commissions(Utc::now() + Duration::days(15)).await.unwrap();
    assert_eq!(released.len(), 1);
    let commission = db.fetch_commission_for_order(&order_id).await.unwrap().unwrap();
    assert_eq!(commission.status, CommissionStatus::Payable);
}
