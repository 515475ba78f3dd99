use std::fmt::Debug;

use ccg_common::EurCents;
use log::info;

use crate::{
    db_types::{LedgerEntry, LedgerEntryType},
    traits::{LedgerError, LedgerManagement, Pagination},
};

/// Read and correction access to the commission ledger. The steady-state writers are the
/// order flow and the payout machine; this API exists for admin views, reconciliation and
/// manual adjustments.
pub struct LedgerApi<B> {
    db: B,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> LedgerApi<B>
where B: LedgerManagement
{
    pub async fn balance(&self, creator_id: i64) -> Result<EurCents, LedgerError> {
        self.db.ledger_balance(creator_id).await
    }

    pub async fn entries(&self, creator_id: i64, pagination: Pagination) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.db.ledger_entries(creator_id, pagination).await
    }

    /// Manual correction entry. Corrections are always *new* entries; nothing in the ledger
    /// is ever edited in place.
    pub async fn append_adjustment(
        &self,
        creator_id: i64,
        amount: EurCents,
        description: &str,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = self.db.append_ledger_entry(creator_id, LedgerEntryType::Adjustment, amount, description).await?;
        info!("📒️ Manual adjustment of {amount} recorded for creator #{creator_id}: {description}");
        Ok(entry)
    }

    /// Re-checks the running-balance invariant over the creator's whole chain. A mismatch
    /// freezes the creator's ledger and surfaces as [`LedgerError::BalanceMismatch`].
    pub async fn verify_chain(&self, creator_id: i64) -> Result<usize, LedgerError> {
        self.db.verify_ledger_chain(creator_id).await
    }
}
