//! Behaviour contracts for storage backends and external collaborators.
//!
//! The engine never talks to a concrete database or payment provider directly. Each concern
//! is a trait defined here, and the API layer ([`crate::cce_api`]) is generic over them, so
//! every component can be exercised against fakes.

mod attribution_store;
mod commerce_database;
pub mod data_objects;
mod idempotency_management;
mod ledger_management;
mod notification_management;
mod payment_rail;
mod payout_management;

pub use attribution_store::{AttributionError, AttributionStore};
pub use commerce_database::{CommerceDatabase, CommerceError};
pub use data_objects::{AnnulledOrderOutcome, ItemSettlement, PaidOrderOutcome, Pagination};
pub use idempotency_management::{IdempotencyError, IdempotencyManagement};
pub use ledger_management::{LedgerError, LedgerManagement};
pub use notification_management::{NotificationError, NotificationManagement};
pub use payment_rail::{PaymentRail, PaymentRailError, TransferReceipt, TransferRequest};
pub use payout_management::{PayoutDatabase, PayoutError, PayoutManagement};
