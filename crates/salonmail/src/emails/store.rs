use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::emails::model::{EmailStatus, PageCursor, ScheduledEmail};

/// What the dispatcher needs from the record store.
///
/// `mark_sent` / `mark_failed` only touch rows that are still `pending` and
/// return whether a row changed.
#[async_trait]
pub trait EmailStore: Send + Sync {
    /// Pending rows with `send_at <= now`, ordered by `(send_at, id)`,
    /// strictly after `after` when given.
    async fn due_page(
        &self,
        now: DateTime<Utc>,
        after: Option<PageCursor>,
        limit: i64,
    ) -> anyhow::Result<Vec<ScheduledEmail>>;

    async fn current_status(&self, id: Uuid) -> anyhow::Result<Option<EmailStatus>>;

    async fn mark_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> anyhow::Result<bool>;

    async fn mark_failed(
        &self,
        id: Uuid,
        failed_at: DateTime<Utc>,
        error_message: &str,
    ) -> anyhow::Result<bool>;
}

/// Whole-run mutual exclusion. Not a per-record lease.
#[async_trait]
pub trait RunLock: Send + Sync {
    /// `false` when another run holds the lock.
    async fn try_acquire(&self) -> anyhow::Result<bool>;

    async fn release(&self) -> anyhow::Result<()>;
}
