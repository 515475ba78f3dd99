use std::fmt::Debug;

use log::info;

use crate::{
    db_types::{NewNotification, Notification},
    traits::{NotificationError, NotificationManagement, Pagination},
};

/// The audit/notification side channel. Fire-and-forget relative to the ledger: callers in
/// the financial flow record notifications after their transactions commit and log failures
/// instead of propagating them.
pub struct NotificationApi<B> {
    db: B,
}

impl<B> Debug for NotificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi")
    }
}

impl<B> NotificationApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> NotificationApi<B>
where B: NotificationManagement
{
    pub async fn record(&self, notification: NewNotification) -> Result<Notification, NotificationError> {
        self.db.record_notification(notification).await
    }

    pub async fn for_creator(
        &self,
        creator_id: i64,
        pagination: Pagination,
    ) -> Result<Vec<Notification>, NotificationError> {
        self.db.notifications_for_creator(creator_id, pagination).await
    }

    /// Synthesizes notifications for ledger entries that have none. Self-healing after a
    /// partial outage; exposed as an admin endpoint.
    pub async fn backfill(&self) -> Result<Vec<Notification>, NotificationError> {
        let created = self.db.backfill_notifications().await?;
        if !created.is_empty() {
            info!("📣️ Backfill created {} notifications for orphaned ledger entries", created.len());
        }
        Ok(created)
    }
}
