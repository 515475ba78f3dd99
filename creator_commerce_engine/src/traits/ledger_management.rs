use ccg_common::EurCents;
use thiserror::Error;

use crate::{
    db_types::{LedgerEntry, LedgerEntryType},
    traits::Pagination,
};

/// The append-only commission ledger.
///
/// `balance_after` must be computed by the storage layer in the same atomic step as the
/// insert, so that two concurrent appends for one creator can never both read the same
/// "previous balance". Entries are immutable; corrections are new offsetting entries.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement: Clone {
    /// Appends an entry and returns it with its computed running balance. Refused with
    /// [`LedgerError::LedgerFrozen`] when the creator's ledger has been frozen by a failed
    /// integrity check.
    async fn append_ledger_entry(
        &self,
        creator_id: i64,
        entry_type: LedgerEntryType,
        amount: EurCents,
        description: &str,
    ) -> Result<LedgerEntry, LedgerError>;

    /// The creator's current balance: `balance_after` of the latest entry, or zero.
    async fn ledger_balance(&self, creator_id: i64) -> Result<EurCents, LedgerError>;

    /// Entries in reverse chronological order.
    async fn ledger_entries(&self, creator_id: i64, pagination: Pagination) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Walks the creator's full chain and verifies that every `balance_after` equals the
    /// previous balance plus the entry's amount. On a mismatch the creator's ledger is frozen
    /// and [`LedgerError::BalanceMismatch`] is returned; this is a broken invariant, not a
    /// recoverable fault. Returns the number of entries checked.
    async fn verify_ledger_chain(&self, creator_id: i64) -> Result<usize, LedgerError>;
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Internal database error in the ledger: {0}")]
    DatabaseError(String),
    #[error("The ledger for creator #{0} is frozen after an integrity violation. Writes are blocked.")]
    LedgerFrozen(i64),
    #[error(
        "Ledger integrity violation for creator #{creator_id} at entry {entry_id}: expected balance {expected}, \
         found {actual}. The creator's ledger has been frozen."
    )]
    BalanceMismatch { creator_id: i64, entry_id: i64, expected: EurCents, actual: EurCents },
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
