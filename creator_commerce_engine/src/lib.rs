//! Creator Commerce Engine
//!
//! The core of the creator commerce gateway: it attributes incoming e-commerce orders to
//! referring creators, books commissions into an append-only ledger, and pays creators out in
//! batches. The library is provider-agnostic.
//!
//! It is divided into three main sections:
//! 1. Storage contracts and the SQLite backend ([`mod@traits`], [`mod@sqlite`]). You should
//!    never need to access the database directly; use the public API instead. The exception
//!    is the data types, which are defined in [`mod@db_types`] and are public.
//! 2. The engine public API ([`mod@cce_api`]): attribution resolution, the webhook order
//!    flow, the ledger, payout batches and the notification channel. Backends implement the
//!    traits in [`mod@traits`] to plug in here.
//! 3. Event hooks ([`mod@events`]): a small actor-style pub-sub used to react to commission
//!    and payout events (e.g. outbound chat notifications) without coupling them to the
//!    financial flow.
pub mod cce_api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use cce_api::{
    AttributionResolver,
    CommissionPolicy,
    ExecuteOutcome,
    ExecutionReport,
    LedgerApi,
    NotificationApi,
    OrderFlowApi,
    OrderPaidResult,
    PayoutApi,
    PayoutPolicy,
};
