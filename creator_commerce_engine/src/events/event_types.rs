use serde::{Deserialize, Serialize};

use crate::db_types::{Commission, Creator, LedgerEntry, Order, PayoutItem};

/// Emitted once per freshly created commission, i.e. never again for a replayed webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionCreatedEvent {
    pub order: Order,
    pub commission: Commission,
    pub creator: Creator,
}

/// Emitted when a payout item settles and its ledger entries are committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutSentEvent {
    pub item: PayoutItem,
    pub commission: Commission,
    pub ledger_entry: LedgerEntry,
}
