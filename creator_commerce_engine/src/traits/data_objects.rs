use serde::{Deserialize, Serialize};

use crate::db_types::{Commission, Creator, LedgerEntry, Order, PayoutItem};

/// Result of processing a paid-order event. `commission` and `ledger_entry` are `None` when
/// the order was unattributed, or when the commission already existed (late replay that
/// slipped past a reset idempotency key).
#[derive(Debug, Clone)]
pub struct PaidOrderOutcome {
    pub order: Order,
    pub creator: Option<Creator>,
    pub commission: Option<Commission>,
    pub ledger_entry: Option<LedgerEntry>,
}

/// Result of annulling an order (refund or cancellation).
#[derive(Debug, Clone)]
pub struct AnnulledOrderOutcome {
    pub order: Order,
    /// The commission after annulment, if the order had one.
    pub commission: Option<Commission>,
    /// The offsetting entry. Only written when a `Paid` commission was cancelled.
    pub ledger_entry: Option<LedgerEntry>,
}

/// Everything written when a payout item settles successfully: the item itself, the paid
/// commission, and the ledger entries for the transfer and (optionally) its fee.
#[derive(Debug, Clone)]
pub struct ItemSettlement {
    pub item: PayoutItem,
    pub commission: Commission,
    pub payout_entry: LedgerEntry,
    pub fee_entry: Option<LedgerEntry>,
}

//--------------------------------------      Pagination       -------------------------------------------------------
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 0, limit: 50 }
    }
}

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit: limit.clamp(1, 500) }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.limit)
    }
}
