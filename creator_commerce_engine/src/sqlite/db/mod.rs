//! # SQLite database methods
//!
//! Low-level SQLite interactions, kept as simple functions (rather than stateful structs)
//! that accept a `&mut SqliteConnection`. Callers obtain a connection from a pool, or open a
//! transaction and pass `&mut *tx`, and compose these calls as the need arises.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod checkout_sessions;
pub mod commissions;
pub mod creators;
pub mod idempotency;
pub mod ledger;
pub mod notifications;
pub mod orders;
pub mod payouts;

const SQLITE_DB_URL: &str = "sqlite://data/ccg_store.db";

pub fn db_url() -> String {
    let result = env::var("CCG_DATABASE_URL").unwrap_or_else(|_| {
        info!("CCG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
