//! `SqliteDatabase` is the concrete SQLite backend for the creator commerce engine.
//!
//! It implements all the storage traits defined in the [`crate::traits`] module. Multi-step
//! operations run inside a single sqlx transaction; notification rows are deliberately
//! written *after* the financial transaction commits, so a notification failure can never
//! roll back a ledger entry.
use std::fmt::Debug;

use ccg_common::{CommissionRate, EurCents};
use chrono::{DateTime, Duration, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{checkout_sessions, commissions, creators, db_url, idempotency, ledger, new_pool, notifications, orders, payouts};
use crate::{
    db_types::{
        derive_terminal_status,
        Attribution,
        BatchStatus,
        CheckoutSession,
        Commission,
        CommissionStatus,
        Creator,
        CreatorStatus,
        IdempotencyCheck,
        IdempotencyRecord,
        LedgerEntry,
        LedgerEntryType,
        NewCommission,
        NewCreator,
        NewNotification,
        NewOrder,
        Notification,
        Order,
        OrderId,
        OrderStatusType,
        PayoutBatch,
        PayoutItem,
    },
    traits::{
        AnnulledOrderOutcome,
        AttributionError,
        AttributionStore,
        CommerceDatabase,
        CommerceError,
        IdempotencyError,
        IdempotencyManagement,
        ItemSettlement,
        LedgerError,
        LedgerManagement,
        NotificationError,
        NotificationManagement,
        PaidOrderOutcome,
        Pagination,
        PayoutError,
        PayoutManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Best-effort notification write, used after financial transactions commit.
    async fn try_record_notification(&self, notification: NewNotification) {
        if let Err(e) = self.record_notification(notification).await {
            warn!("🗃️ Could not record notification (the financial entry is already committed): {e}");
        }
    }
}

impl AttributionStore for SqliteDatabase {
    async fn fetch_creator(&self, creator_id: i64) -> Result<Option<Creator>, AttributionError> {
        let mut conn = self.pool.acquire().await?;
        let creator = creators::fetch_creator(creator_id, &mut conn).await?;
        Ok(creator)
    }

    async fn fetch_creator_by_discount_code(&self, code: &str) -> Result<Option<Creator>, AttributionError> {
        let mut conn = self.pool.acquire().await?;
        let creator = creators::fetch_creator_by_discount_code(code, &mut conn).await?;
        Ok(creator)
    }

    async fn fetch_checkout_session(&self, cart_token: &str) -> Result<Option<CheckoutSession>, AttributionError> {
        let mut conn = self.pool.acquire().await?;
        let session = checkout_sessions::fetch_session(cart_token, &mut conn).await?;
        Ok(session)
    }
}

impl IdempotencyManagement for SqliteDatabase {
    async fn acquire_idempotency_key(
        &self,
        operation: &str,
        natural_key: &str,
    ) -> Result<IdempotencyCheck, IdempotencyError> {
        let mut conn = self.pool.acquire().await?;
        idempotency::acquire(operation, natural_key, &mut conn).await
    }

    async fn complete_idempotency_key(
        &self,
        operation: &str,
        natural_key: &str,
        response: &serde_json::Value,
    ) -> Result<(), IdempotencyError> {
        let mut conn = self.pool.acquire().await?;
        idempotency::complete(operation, natural_key, response, &mut conn).await
    }

    async fn fail_idempotency_key(&self, operation: &str, natural_key: &str, error: &str) -> Result<(), IdempotencyError> {
        let mut conn = self.pool.acquire().await?;
        idempotency::fail(operation, natural_key, error, &mut conn).await
    }

    async fn fetch_idempotency_record(
        &self,
        operation: &str,
        natural_key: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyError> {
        let mut conn = self.pool.acquire().await?;
        let record = idempotency::fetch(operation, natural_key, &mut conn).await?;
        Ok(record)
    }
}

impl CommerceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn upsert_order(
        &self,
        order: &NewOrder,
        status: OrderStatusType,
        attribution: Option<&Attribution>,
    ) -> Result<(Order, bool), CommerceError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::upsert_order(order, status, attribution, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, CommerceError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_commission_for_order(&self, order_id: &OrderId) -> Result<Option<Commission>, CommerceError> {
        let mut conn = self.pool.acquire().await?;
        let commission = commissions::fetch_commission_for_order(order_id, &mut conn).await?;
        Ok(commission)
    }

    async fn process_paid_order(
        &self,
        order: &NewOrder,
        attribution: Option<&Attribution>,
        maturity: Option<Duration>,
    ) -> Result<PaidOrderOutcome, CommerceError> {
        let mut tx = self.pool.begin().await?;
        let (stored, _inserted) = orders::upsert_order(order, OrderStatusType::Confirmed, attribution, &mut tx).await?;
        if stored.status != OrderStatusType::Confirmed {
            // A paid event that arrived after the order was refunded or cancelled. The order
            // row is untouchable and no commission may be created for it.
            tx.commit().await?;
            warn!("🗃️ Paid event for order {} ignored: the order is already {}", stored.order_id, stored.status);
            return Ok(PaidOrderOutcome { order: stored, creator: None, commission: None, ledger_entry: None });
        }
        let attribution = match attribution {
            Some(a) => a,
            None => {
                tx.commit().await?;
                debug!("🗃️ Order {} confirmed without attribution. No commission due.", stored.order_id);
                return Ok(PaidOrderOutcome { order: stored, creator: None, commission: None, ledger_entry: None });
            },
        };
        let creator = creators::fetch_creator(attribution.creator_id, &mut tx)
            .await?
            .ok_or(CommerceError::CreatorNotFound(attribution.creator_id))?;
        let new_commission = NewCommission::for_order(&stored, &creator, maturity);
        let initial_status =
            if new_commission.lock_until.is_some() { CommissionStatus::Pending } else { CommissionStatus::Payable };
        let (commission, created) = commissions::idempotent_insert(new_commission, initial_status, &mut tx).await?;
        if !created {
            tx.commit().await?;
            debug!("🗃️ Order {} already has commission {}. Nothing more to do.", stored.order_id, commission.id);
            return Ok(PaidOrderOutcome { order: stored, creator: Some(creator), commission: Some(commission), ledger_entry: None });
        }
        let description = format!("Commission for order {}", stored.order_id);
        let entry = ledger::append(
            creator.id,
            LedgerEntryType::CommissionEarned,
            commission.amount,
            &description,
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order {} earned {} ({} of {}) for creator #{}",
            stored.order_id, commission.amount, commission.rate, commission.order_subtotal, creator.id
        );
        let notification = NewNotification::new(creator.id, "commission.earned", "Commission earned", description.as_str())
            .with_amount(commission.amount)
            .for_ledger_entry(entry.id);
        self.try_record_notification(notification).await;
        Ok(PaidOrderOutcome { order: stored, creator: Some(creator), commission: Some(commission), ledger_entry: Some(entry) })
    }

    async fn annul_order(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<AnnulledOrderOutcome, CommerceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::annul_order(order_id, new_status, &mut tx).await?;
        let before = commissions::cancel_commission_for_order(order_id, &mut tx).await?;
        // Only a commission that had already been paid out needs an offsetting entry; a
        // pending/payable one simply stops being payable.
        let entry = match &before {
            Some(c) if c.status == CommissionStatus::Paid => {
                let description = format!("Commission for refunded order {order_id} reversed");
                let entry =
                    ledger::append(c.creator_id, LedgerEntryType::CommissionCanceled, -c.amount, &description, &mut tx)
                        .await?;
                Some(entry)
            },
            _ => None,
        };
        let commission = commissions::fetch_commission_for_order(order_id, &mut tx).await?;
        tx.commit().await?;
        if let Some(c) = before.as_ref().filter(|c| c.status != CommissionStatus::Canceled) {
            info!("🗃️ Commission {} cancelled because order {order_id} is now {new_status}", c.id);
            let notification = NewNotification::new(
                c.creator_id,
                "commission.canceled",
                "Commission canceled",
                format!("Order {order_id} was {new_status}; the commission was canceled"),
            )
            .with_amount(c.amount);
            let notification = match entry.as_ref() {
                Some(e) => notification.for_ledger_entry(e.id),
                None => notification,
            };
            self.try_record_notification(notification).await;
        }
        Ok(AnnulledOrderOutcome { order, commission, ledger_entry: entry })
    }

    async fn release_matured_commissions(&self, now: DateTime<Utc>) -> Result<Vec<Commission>, CommerceError> {
        let mut tx = self.pool.begin().await?;
        let released = commissions::release_matured(now, &mut tx).await?;
        tx.commit().await?;
        if !released.is_empty() {
            debug!("🗃️ {} commissions released to Payable", released.len());
        }
        Ok(released)
    }

    async fn insert_creator(&self, creator: NewCreator) -> Result<Creator, CommerceError> {
        let mut conn = self.pool.acquire().await?;
        creators::insert_creator(creator, &mut conn).await
    }

    async fn set_creator_commission_rate(&self, creator_id: i64, rate: CommissionRate) -> Result<Creator, CommerceError> {
        let mut conn = self.pool.acquire().await?;
        let creator = creators::set_commission_rate(creator_id, rate, &mut conn).await?;
        debug!("🗃️ Creator #{creator_id} rate changed to {rate}. Existing commissions keep their snapshots.");
        Ok(creator)
    }

    async fn set_creator_status(&self, creator_id: i64, status: CreatorStatus) -> Result<Creator, CommerceError> {
        let mut conn = self.pool.acquire().await?;
        creators::set_status(creator_id, status, &mut conn).await
    }

    async fn upsert_checkout_session(
        &self,
        cart_token: &str,
        creator_id: i64,
        routine_id: Option<i64>,
    ) -> Result<CheckoutSession, CommerceError> {
        let mut conn = self.pool.acquire().await?;
        let session = checkout_sessions::upsert_session(cart_token, creator_id, routine_id, &mut conn).await?;
        Ok(session)
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn append_ledger_entry(
        &self,
        creator_id: i64,
        entry_type: LedgerEntryType,
        amount: EurCents,
        description: &str,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let entry = ledger::append(creator_id, entry_type, amount, description, &mut tx).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn ledger_balance(&self, creator_id: i64) -> Result<EurCents, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ledger::latest_balance(creator_id, &mut conn).await
    }

    async fn ledger_entries(&self, creator_id: i64, pagination: Pagination) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ledger::entries_page(creator_id, pagination, &mut conn).await
    }

    async fn verify_ledger_chain(&self, creator_id: i64) -> Result<usize, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let checked = ledger::verify_chain(creator_id, &mut tx).await;
        // The freeze must stick even though the check failed.
        tx.commit().await?;
        checked
    }
}

impl PayoutManagement for SqliteDatabase {
    async fn create_payout_batch(&self, fee_per_transfer: EurCents) -> Result<(PayoutBatch, Vec<PayoutItem>), PayoutError> {
        let mut tx = self.pool.begin().await?;
        let payable = payouts::select_payable_commissions(&mut tx).await?;
        let eligible: Vec<&Commission> = payable.iter().filter(|c| c.amount > fee_per_transfer).collect();
        if eligible.len() < payable.len() {
            warn!(
                "💸️ {} payable commissions are smaller than the {} transfer fee and were left out of the batch",
                payable.len() - eligible.len(),
                fee_per_transfer
            );
        }
        if eligible.is_empty() {
            return Err(PayoutError::NoPayableCommissions);
        }
        let batch = payouts::insert_batch(&mut tx).await?;
        let mut items = Vec::with_capacity(eligible.len());
        for commission in eligible {
            let item = payouts::insert_item(batch.id, commission, fee_per_transfer, &mut tx).await?;
            items.push(item);
        }
        tx.commit().await?;
        info!("💸️ Payout batch #{} drafted with {} items", batch.id, items.len());
        Ok((batch, items))
    }

    async fn fetch_payout_batch(&self, batch_id: i64) -> Result<(PayoutBatch, Vec<PayoutItem>), PayoutError> {
        let mut conn = self.pool.acquire().await?;
        let batch = payouts::fetch_batch(batch_id, &mut conn).await?.ok_or(PayoutError::BatchNotFound(batch_id))?;
        let items = payouts::fetch_items(batch_id, &mut conn).await?;
        Ok((batch, items))
    }

    async fn list_payout_batches(&self) -> Result<Vec<PayoutBatch>, PayoutError> {
        let mut conn = self.pool.acquire().await?;
        let batches = payouts::list_batches(&mut conn).await?;
        Ok(batches)
    }

    async fn approve_payout_batch(&self, batch_id: i64) -> Result<PayoutBatch, PayoutError> {
        let mut tx = self.pool.begin().await?;
        let items = payouts::fetch_items(batch_id, &mut tx).await?;
        if items.is_empty() {
            return Err(PayoutError::NoPayableCommissions);
        }
        // Commission state can change between draft and approval; re-validate every item.
        for item in &items {
            let commission = commissions::fetch_commission(item.commission_id, &mut tx)
                .await?
                .ok_or(PayoutError::ItemNotFound(item.id))?;
            if commission.status != CommissionStatus::Payable {
                return Err(PayoutError::CommissionNotPayable {
                    commission_id: commission.id,
                    status: commission.status,
                });
            }
        }
        let batch = payouts::update_batch_status(batch_id, BatchStatus::Draft, BatchStatus::Approved, &mut tx).await?;
        tx.commit().await?;
        info!("💸️ Payout batch #{batch_id} approved ({} items)", items.len());
        Ok(batch)
    }

    async fn start_batch_execution(&self, batch_id: i64) -> Result<PayoutBatch, PayoutError> {
        let mut tx = self.pool.begin().await?;
        let batch = payouts::update_batch_status(batch_id, BatchStatus::Approved, BatchStatus::Executing, &mut tx).await?;
        tx.commit().await?;
        Ok(batch)
    }

    async fn fetch_item_commission(&self, item_id: i64) -> Result<Commission, PayoutError> {
        let mut conn = self.pool.acquire().await?;
        let item = payouts::fetch_item(item_id, &mut conn).await?.ok_or(PayoutError::ItemNotFound(item_id))?;
        let commission = commissions::fetch_commission(item.commission_id, &mut conn)
            .await?
            .ok_or(PayoutError::ItemNotFound(item_id))?;
        Ok(commission)
    }

    async fn mark_item_processing(&self, item_id: i64) -> Result<PayoutItem, PayoutError> {
        let mut tx = self.pool.begin().await?;
        let item = payouts::mark_item_processing(item_id, &mut tx).await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn settle_payout_item(&self, item_id: i64, transfer_id: &str) -> Result<ItemSettlement, PayoutError> {
        let mut tx = self.pool.begin().await?;
        let item = payouts::complete_item(item_id, transfer_id, &mut tx).await?;
        let commission = commissions::fetch_commission(item.commission_id, &mut tx)
            .await?
            .ok_or(PayoutError::ItemNotFound(item_id))?;
        let description = format!("Payout for order {} (transfer {transfer_id})", commission.order_id);
        let payout_entry =
            ledger::append(item.creator_id, LedgerEntryType::PayoutSent, -item.net_amount, &description, &mut tx).await?;
        let fee_entry = if item.fee.is_zero() {
            None
        } else {
            let fee_description = format!("Transfer fee for order {}", commission.order_id);
            Some(ledger::append(item.creator_id, LedgerEntryType::PayoutFee, -item.fee, &fee_description, &mut tx).await?)
        };
        let commission = match commissions::update_commission_status(
            commission.id,
            CommissionStatus::Payable,
            CommissionStatus::Paid,
            &mut tx,
        )
        .await?
        {
            Some(c) => c,
            None => {
                // The transfer has already been sent, so Paid wins over whatever state the
                // commission reached in the meantime.
                warn!(
                    "💸️ Commission {} was not Payable while settling item {item_id}. Forcing it to Paid because the \
                     money has moved.",
                    commission.id
                );
                sqlx::query_as("UPDATE commissions SET status = 'Paid', updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *")
                    .bind(commission.id)
                    .fetch_one(&mut *tx)
                    .await?
            },
        };
        tx.commit().await?;
        debug!("💸️ Item {item_id} settled: {} to creator #{} (transfer {transfer_id})", item.net_amount, item.creator_id);
        let notification = NewNotification::new(item.creator_id, "payout.sent", "Payout sent", description.as_str())
            .with_amount(item.net_amount)
            .for_ledger_entry(payout_entry.id);
        self.try_record_notification(notification).await;
        Ok(ItemSettlement { item, commission, payout_entry, fee_entry })
    }

    async fn fail_payout_item(&self, item_id: i64, error: &str) -> Result<PayoutItem, PayoutError> {
        let mut tx = self.pool.begin().await?;
        let item = payouts::fail_item(item_id, error, &mut tx).await?;
        tx.commit().await?;
        warn!("💸️ Payout item {item_id} failed: {error}. The commission remains payable.");
        Ok(item)
    }

    async fn skip_payout_item(&self, item_id: i64, reason: &str) -> Result<PayoutItem, PayoutError> {
        let mut tx = self.pool.begin().await?;
        let item = payouts::skip_item(item_id, reason, &mut tx).await?;
        tx.commit().await?;
        debug!("💸️ Payout item {item_id} skipped: {reason}");
        Ok(item)
    }

    async fn finalize_payout_batch(&self, batch_id: i64) -> Result<PayoutBatch, PayoutError> {
        let mut tx = self.pool.begin().await?;
        let batch = payouts::fetch_batch(batch_id, &mut tx).await?.ok_or(PayoutError::BatchNotFound(batch_id))?;
        if batch.status.is_terminal() {
            return Ok(batch);
        }
        let items = payouts::fetch_items(batch_id, &mut tx).await?;
        let statuses: Vec<_> = items.iter().map(|i| i.status).collect();
        let terminal = derive_terminal_status(&statuses);
        let batch = payouts::update_batch_status(batch_id, BatchStatus::Executing, terminal, &mut tx).await?;
        tx.commit().await?;
        info!("💸️ Payout batch #{batch_id} finalized as {terminal}");
        Ok(batch)
    }
}

impl NotificationManagement for SqliteDatabase {
    async fn record_notification(&self, notification: NewNotification) -> Result<Notification, NotificationError> {
        let mut conn = self.pool.acquire().await?;
        notifications::insert(notification, &mut conn).await
    }

    async fn notifications_for_creator(
        &self,
        creator_id: i64,
        pagination: Pagination,
    ) -> Result<Vec<Notification>, NotificationError> {
        let mut conn = self.pool.acquire().await?;
        notifications::for_creator(creator_id, pagination, &mut conn).await
    }

    async fn backfill_notifications(&self) -> Result<Vec<Notification>, NotificationError> {
        let mut conn = self.pool.acquire().await?;
        notifications::backfill(&mut conn).await
    }
}
