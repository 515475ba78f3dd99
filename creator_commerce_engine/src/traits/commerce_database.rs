use chrono::{DateTime, Duration, Utc};
use ccg_common::CommissionRate;
use thiserror::Error;

use crate::{
    db_types::{Attribution, CheckoutSession, Commission, Creator, CreatorStatus, NewCreator, NewOrder, Order, OrderId, OrderStatusType},
    traits::{
        AnnulledOrderOutcome,
        AttributionError,
        AttributionStore,
        IdempotencyError,
        IdempotencyManagement,
        LedgerError,
        NotificationError,
        PaidOrderOutcome,
    },
};

/// The highest-level storage contract for the order/commission flow. Backends implement the
/// multi-step operations as single atomic transactions; the API layer sequences them behind
/// the idempotency gate and publishes events.
#[allow(async_fn_in_trait)]
pub trait CommerceDatabase: Clone + AttributionStore + IdempotencyManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Insert-or-update the order keyed by its external id. Never creates a second row for
    /// the same external id. Attribution fields are only ever filled in, not overwritten with
    /// `None`. Orders in a terminal status are left untouched except for the
    /// `Confirmed → Refunded` transition.
    ///
    /// Returns the stored order and `true` if a row was inserted (vs. updated).
    async fn upsert_order(
        &self,
        order: &NewOrder,
        status: OrderStatusType,
        attribution: Option<&Attribution>,
    ) -> Result<(Order, bool), CommerceError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, CommerceError>;

    async fn fetch_commission_for_order(&self, order_id: &OrderId) -> Result<Option<Commission>, CommerceError>;

    /// The paid-order transaction: upsert the order as `Confirmed` and, when attributed,
    /// create exactly one commission (rate and amount frozen from the creator's current rate
    /// and the order subtotal), append the `CommissionEarned` ledger entry and record the
    /// notification — all atomically.
    ///
    /// A commission that already exists for the order is returned untouched with no new
    /// ledger entry, which keeps a partial redo safe.
    async fn process_paid_order(
        &self,
        order: &NewOrder,
        attribution: Option<&Attribution>,
        maturity: Option<Duration>,
    ) -> Result<PaidOrderOutcome, CommerceError>;

    /// The refund/cancellation transaction: move the order to `new_status` and annul its
    /// commission. A `Paid` commission is cancelled together with an offsetting negative
    /// `CommissionCanceled` ledger entry; a commission in any other non-terminal state is
    /// cancelled without touching the ledger.
    async fn annul_order(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<AnnulledOrderOutcome, CommerceError>;

    /// The maturity sweep: `Pending` commissions inside their hold become `Locked`;
    /// `Pending`/`Locked` commissions whose `lock_until` has passed (or is absent) become
    /// `Payable`. Returns the commissions released to `Payable`.
    async fn release_matured_commissions(&self, now: DateTime<Utc>) -> Result<Vec<Commission>, CommerceError>;

    async fn insert_creator(&self, creator: NewCreator) -> Result<Creator, CommerceError>;

    /// Changes the creator's rate going forward. Existing commissions keep their snapshots.
    async fn set_creator_commission_rate(&self, creator_id: i64, rate: CommissionRate) -> Result<Creator, CommerceError>;

    async fn set_creator_status(&self, creator_id: i64, status: CreatorStatus) -> Result<Creator, CommerceError>;

    /// Records a checkout-session linkage. Only the checkout flow writes these in production;
    /// the engine exposes the upsert for tooling and tests.
    async fn upsert_checkout_session(
        &self,
        cart_token: &str,
        creator_id: i64,
        routine_id: Option<i64>,
    ) -> Result<CheckoutSession, CommerceError>;
}

#[derive(Debug, Clone, Error)]
pub enum CommerceError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested creator #{0} does not exist")]
    CreatorNotFound(i64),
    #[error("Order {0} is in terminal status {1} and cannot be modified")]
    OrderImmutable(OrderId, OrderStatusType),
    #[error("{0}")]
    AttributionError(#[from] AttributionError),
    #[error("{0}")]
    LedgerError(#[from] LedgerError),
    #[error("{0}")]
    NotificationError(#[from] NotificationError),
    #[error("{0}")]
    IdempotencyError(#[from] IdempotencyError),
}

impl From<sqlx::Error> for CommerceError {
    fn from(e: sqlx::Error) -> Self {
        CommerceError::DatabaseError(e.to_string())
    }
}
