use ccg_common::EurCents;
use log::{debug, error};
use sqlx::SqliteConnection;

use crate::{
    db_types::{LedgerEntry, LedgerEntryType},
    sqlite::db::creators,
    traits::{LedgerError, Pagination},
};

/// Appends an entry, computing `balance_after` in the same INSERT statement. The subquery
/// over the creator's latest entry runs inside the statement's implicit transaction, so two
/// concurrent appends can never both see the same previous balance — the serialization the
/// ledger invariant depends on lives here, not in application code.
pub async fn append(
    creator_id: i64,
    entry_type: LedgerEntryType,
    amount: EurCents,
    description: &str,
    conn: &mut SqliteConnection,
) -> Result<LedgerEntry, LedgerError> {
    if creators::is_ledger_frozen(creator_id, &mut *conn).await? {
        return Err(LedgerError::LedgerFrozen(creator_id));
    }
    let entry: LedgerEntry = sqlx::query_as(
        r#"
            INSERT INTO ledger_entries (creator_id, entry_type, amount, balance_after, description)
            VALUES (
                $1, $2, $3,
                COALESCE((SELECT balance_after FROM ledger_entries WHERE creator_id = $1 ORDER BY id DESC LIMIT 1), 0) + $3,
                $4
            )
            RETURNING *;
        "#,
    )
    .bind(creator_id)
    .bind(entry_type.to_string())
    .bind(amount)
    .bind(description)
    .fetch_one(conn)
    .await?;
    debug!("📒️ Ledger entry {} for creator #{creator_id}: {entry_type} {amount}, balance {}", entry.id, entry.balance_after);
    Ok(entry)
}

pub async fn latest_balance(creator_id: i64, conn: &mut SqliteConnection) -> Result<EurCents, LedgerError> {
    let balance: Option<i64> =
        sqlx::query_scalar("SELECT balance_after FROM ledger_entries WHERE creator_id = $1 ORDER BY id DESC LIMIT 1")
            .bind(creator_id)
            .fetch_optional(conn)
            .await?;
    Ok(EurCents::from(balance.unwrap_or(0)))
}

/// Entries in reverse chronological order.
pub async fn entries_page(
    creator_id: i64,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, LedgerError> {
    let entries = sqlx::query_as(
        "SELECT * FROM ledger_entries WHERE creator_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3",
    )
    .bind(creator_id)
    .bind(i64::from(pagination.limit))
    .bind(pagination.offset())
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

/// Walks the whole chain oldest-first and checks the running-balance invariant. On the first
/// mismatch the creator's ledger is frozen and the violation returned. Returns the number of
/// entries checked.
pub async fn verify_chain(creator_id: i64, conn: &mut SqliteConnection) -> Result<usize, LedgerError> {
    let entries: Vec<LedgerEntry> =
        sqlx::query_as("SELECT * FROM ledger_entries WHERE creator_id = $1 ORDER BY id ASC")
            .bind(creator_id)
            .fetch_all(&mut *conn)
            .await?;
    let mut expected = EurCents::from(0);
    for entry in &entries {
        expected += entry.amount;
        if entry.balance_after != expected {
            error!(
                "📒️ Ledger integrity violation for creator #{creator_id} at entry {}: expected {expected}, found {}. \
                 Freezing the ledger.",
                entry.id, entry.balance_after
            );
            creators::freeze_ledger(creator_id, conn).await?;
            return Err(LedgerError::BalanceMismatch {
                creator_id,
                entry_id: entry.id,
                expected,
                actual: entry.balance_after,
            });
        }
    }
    Ok(entries.len())
}
