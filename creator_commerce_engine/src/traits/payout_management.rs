use ccg_common::EurCents;
use thiserror::Error;

use crate::{
    db_types::{BatchStatus, Commission, CommissionStatus, PayoutBatch, PayoutItem},
    traits::{AttributionError, IdempotencyError, ItemSettlement, LedgerError},
};

/// Storage contract for the payout batch state machine.
///
/// Every transition method re-checks the current status inside its own transaction and fails
/// with a typed error when the row is not where the caller thinks it is — the state machine
/// never trusts an earlier read.
#[allow(async_fn_in_trait)]
pub trait PayoutManagement: Clone {
    /// Selects every commission that is `Payable`, belongs to an `Active` creator with
    /// verified bank details and an unfrozen ledger, and is not already referenced by a live
    /// item of another batch; creates a `Draft` batch with one item per commission.
    ///
    /// `fee_per_transfer` is deducted from each item: `net = amount - fee`.
    async fn create_payout_batch(&self, fee_per_transfer: EurCents) -> Result<(PayoutBatch, Vec<PayoutItem>), PayoutError>;

    async fn fetch_payout_batch(&self, batch_id: i64) -> Result<(PayoutBatch, Vec<PayoutItem>), PayoutError>;

    async fn list_payout_batches(&self) -> Result<Vec<PayoutBatch>, PayoutError>;

    /// `Draft → Approved`. Re-validates at approval time that the batch is non-empty and that
    /// every item's commission is still `Payable` — commission state can change between draft
    /// and approval.
    async fn approve_payout_batch(&self, batch_id: i64) -> Result<PayoutBatch, PayoutError>;

    /// `Approved → Executing`, stamping `executed_at`.
    async fn start_batch_execution(&self, batch_id: i64) -> Result<PayoutBatch, PayoutError>;

    /// The current state of the commission an item refers to. Execution re-checks this right
    /// before sending money, because a refund can land between approval and execution.
    async fn fetch_item_commission(&self, item_id: i64) -> Result<Commission, PayoutError>;

    /// `Pending → Processing` for one item. Fails if the item has already left `Pending`, so
    /// a racing execution pass cannot pick it up twice.
    async fn mark_item_processing(&self, item_id: i64) -> Result<PayoutItem, PayoutError>;

    /// The success transaction for one item: item `Processing → Completed` with the rail's
    /// transfer id, `PayoutSent` (and `PayoutFee` when the fee is non-zero) ledger entries,
    /// and commission → `Paid` — atomically. The creator notification is written after the
    /// commit, best-effort.
    async fn settle_payout_item(&self, item_id: i64, transfer_id: &str) -> Result<ItemSettlement, PayoutError>;

    /// Item `→ Failed` with the verbatim error. No ledger writes; the commission stays
    /// `Payable` and is eligible for a future batch.
    async fn fail_payout_item(&self, item_id: i64, error: &str) -> Result<PayoutItem, PayoutError>;

    /// Item `→ Skipped` (e.g. its commission was cancelled between approval and execution).
    async fn skip_payout_item(&self, item_id: i64, reason: &str) -> Result<PayoutItem, PayoutError>;

    /// Derives and persists the batch's terminal status from its items, in one transaction.
    /// Batches never transition backward.
    async fn finalize_payout_batch(&self, batch_id: i64) -> Result<PayoutBatch, PayoutError>;
}

#[derive(Debug, Clone, Error)]
pub enum PayoutError {
    #[error("Internal database error in the payout store: {0}")]
    DatabaseError(String),
    #[error("Payout batch #{0} does not exist")]
    BatchNotFound(i64),
    #[error("Payout item #{0} does not exist")]
    ItemNotFound(i64),
    #[error("There are no payable commissions to batch")]
    NoPayableCommissions,
    #[error("Payout batch #{batch_id} is {actual}, expected {expected}")]
    BatchNotInStatus { batch_id: i64, expected: BatchStatus, actual: BatchStatus },
    #[error("Payout item #{0} has already left Pending")]
    ItemNotPending(i64),
    #[error("Commission #{commission_id} is {status}, not Payable")]
    CommissionNotPayable { commission_id: i64, status: CommissionStatus },
    #[error("{0}")]
    LedgerError(#[from] LedgerError),
    #[error("{0}")]
    IdempotencyError(#[from] IdempotencyError),
    #[error("{0}")]
    AttributionError(#[from] AttributionError),
}

impl From<sqlx::Error> for PayoutError {
    fn from(e: sqlx::Error) -> Self {
        PayoutError::DatabaseError(e.to_string())
    }
}

/// Everything the payout API needs from a backend, as one nameable bound (HTTP handlers are
/// generic over it).
pub trait PayoutDatabase: PayoutManagement + crate::traits::IdempotencyManagement + crate::traits::AttributionStore {}

impl<T> PayoutDatabase for T where T: PayoutManagement + crate::traits::IdempotencyManagement + crate::traits::AttributionStore {}
