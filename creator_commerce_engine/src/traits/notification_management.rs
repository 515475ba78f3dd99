use thiserror::Error;

use crate::{
    db_types::{NewNotification, Notification},
    traits::Pagination,
};

/// The audit/notification side channel. Writes here happen *after* the financial transaction
/// commits; a failure is logged by the caller and never rolls back a ledger entry.
#[allow(async_fn_in_trait)]
pub trait NotificationManagement: Clone {
    async fn record_notification(&self, notification: NewNotification) -> Result<Notification, NotificationError>;

    async fn notifications_for_creator(
        &self,
        creator_id: i64,
        pagination: Pagination,
    ) -> Result<Vec<Notification>, NotificationError>;

    /// Synthesizes notifications for ledger entries that have none. Self-healing after a
    /// partial outage; not part of the steady-state path.
    async fn backfill_notifications(&self) -> Result<Vec<Notification>, NotificationError>;
}

#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Internal database error in the notification store: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for NotificationError {
    fn from(e: sqlx::Error) -> Self {
        NotificationError::DatabaseError(e.to_string())
    }
}
