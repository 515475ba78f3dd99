mod support;

use ccg_common::EurCents;
use creator_commerce_engine::{
    db_types::LedgerEntryType,
    traits::{LedgerError, LedgerManagement, NotificationManagement, Pagination},
};
use support::{new_test_db, seed_creator};

#[tokio::test]
async fn balance_after_always_equals_the_running_sum() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;

    let amounts: Vec<i64> = vec![1_500, 2_000, -1_465, -35, 700, -100];
    let mut running = 0;
    for (i, amount) in amounts.iter().enumerate() {
        let entry = db
            .append_ledger_entry(emma.id, LedgerEntryType::Adjustment, EurCents::from(*amount), &format!("entry {i}"))
            .await
            .unwrap();
        running += amount;
        assert_eq!(entry.balance_after, EurCents::from(running));
    }
    assert_eq!(db.ledger_balance(emma.id).await.unwrap(), EurCents::from(running));
    let checked = db.verify_ledger_chain(emma.id).await.unwrap();
    assert_eq!(checked, amounts.len());
}

#[tokio::test]
async fn concurrent_appends_serialize_instead_of_corrupting_the_chain() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;

    let mut handles = Vec::new();
    for i in 0..20 {
        let db = db.clone();
        let creator_id = emma.id;
        handles.push(tokio::spawn(async move {
            db.append_ledger_entry(creator_id, LedgerEntryType::Adjustment, EurCents::from(100 + i), "concurrent")
                .await
                .expect("append failed")
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Whatever the interleaving, the chain must verify and the balance must be the sum.
    let expected: i64 = (0..20).map(|i| 100 + i).sum();
    assert_eq!(db.ledger_balance(emma.id).await.unwrap(), EurCents::from(expected));
    assert_eq!(db.verify_ledger_chain(emma.id).await.unwrap(), 20);
}

#[tokio::test]
async fn entries_come_back_in_reverse_chronological_pages() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    for i in 0..7 {
        db.append_ledger_entry(emma.id, LedgerEntryType::Adjustment, EurCents::from(i + 1), &format!("entry {i}"))
            .await
            .unwrap();
    }

    let page = db.ledger_entries(emma.id, Pagination::new(0, 3)).await.unwrap();
    assert_eq!(page.len(), 3);
    assert_eq!(page[0].description, "entry 6");
    assert_eq!(page[2].description, "entry 4");

    let page = db.ledger_entries(emma.id, Pagination::new(2, 3)).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].description, "entry 0");
}

#[tokio::test]
async fn a_tampered_chain_freezes_the_ledger() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    db.append_ledger_entry(emma.id, LedgerEntryType::CommissionEarned, EurCents::from(1_500), "ok").await.unwrap();
    db.append_ledger_entry(emma.id, LedgerEntryType::CommissionEarned, EurCents::from(500), "ok").await.unwrap();

    // Corrupt the second entry behind the engine's back.
    sqlx::query("UPDATE ledger_entries SET balance_after = 9999 WHERE creator_id = $1 AND amount = 500")
        .bind(emma.id)
        .execute(db.pool())
        .await
        .unwrap();

    let err = db.verify_ledger_chain(emma.id).await.expect_err("the mismatch must be detected");
    match err {
        LedgerError::BalanceMismatch { creator_id, expected, actual, .. } => {
            assert_eq!(creator_id, emma.id);
            assert_eq!(expected, EurCents::from(2_000));
            assert_eq!(actual, EurCents::from(9_999));
        },
        other => panic!("Expected a balance mismatch, got {other}"),
    }

    // Fatal: all further writes for this creator are refused.
    let err = db
        .append_ledger_entry(emma.id, LedgerEntryType::Adjustment, EurCents::from(1), "should fail")
        .await
        .expect_err("frozen ledgers must refuse writes");
    assert!(matches!(err, LedgerError::LedgerFrozen(_)), "got {err}");
}

#[tokio::test]
async fn backfill_synthesizes_missing_notifications_once() {
    let db = new_test_db().await;
    let emma = seed_creator(&db, "Emma", "EMMA15", 1500).await;
    // Direct appends bypass the notification side channel, leaving orphaned entries.
    db.append_ledger_entry(emma.id, LedgerEntryType::CommissionEarned, EurCents::from(1_500), "orphan 1").await.unwrap();
    db.append_ledger_entry(emma.id, LedgerEntryType::Adjustment, EurCents::from(-200), "orphan 2").await.unwrap();

    let created = db.backfill_notifications().await.unwrap();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|n| n.ledger_entry_id.is_some()));

    // Idempotent: a second run finds nothing to heal.
    let created = db.backfill_notifications().await.unwrap();
    assert!(created.is_empty());

    let notifications = db.notifications_for_creator(emma.id, Pagination::default()).await.unwrap();
    assert_eq!(notifications.len(), 2);
}
