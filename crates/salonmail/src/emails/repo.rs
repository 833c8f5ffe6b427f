use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::emails::model::{EmailStatus, NewScheduledEmail, PageCursor, ScheduledEmail};
use crate::emails::store::EmailStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub due: i64,
    pub sent: i64,
    pub failed: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequeueOutcome {
    Requeued(Uuid),
    NotFound,
    NotFailed(String),
}

#[derive(Clone)]
pub struct ScheduledEmailsRepo {
    pool: PgPool,
}

impl ScheduledEmailsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ----------------------------
    // Enqueue
    // ----------------------------

    pub async fn enqueue(&self, new: &NewScheduledEmail) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        insert(&self.pool, id, new).await?;
        Ok(id)
    }

    /// All-or-nothing insert of a reservation's planned emails.
    pub async fn enqueue_many(&self, items: &[NewScheduledEmail]) -> anyhow::Result<Vec<Uuid>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(items.len());

        for new in items {
            let id = Uuid::new_v4();
            insert(&mut *tx, id, new).await?;
            ids.push(id);
        }

        tx.commit().await?;
        Ok(ids)
    }

    // ----------------------------
    // Reads
    // ----------------------------

    pub async fn get(&self, id: Uuid) -> anyhow::Result<Option<ScheduledEmail>> {
        let row = sqlx::query_as::<_, ScheduledEmail>("SELECT * FROM scheduled_emails WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Cursor-paginated listing, newest first. Cursor is `(created_at, id)`.
    pub async fn list(
        &self,
        status: Option<&str>,
        limit: i64,
        cursor_created_at: Option<DateTime<Utc>>,
        cursor_id: Option<Uuid>,
    ) -> anyhow::Result<Vec<ScheduledEmail>> {
        let limit = limit.clamp(1, 500);

        let rows = sqlx::query_as::<_, ScheduledEmail>(
            r#"
            SELECT *
            FROM scheduled_emails
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::timestamptz IS NULL OR (created_at, id) < ($2::timestamptz, $3::uuid))
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(status)
        .bind(cursor_created_at)
        .bind(cursor_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_for_related(
        &self,
        related_type: &str,
        related_id: i64,
    ) -> anyhow::Result<Vec<ScheduledEmail>> {
        let rows = sqlx::query_as::<_, ScheduledEmail>(
            r#"
            SELECT *
            FROM scheduled_emails
            WHERE related_type = $1 AND related_id = $2
            ORDER BY send_at ASC, id ASC
            "#,
        )
        .bind(related_type)
        .bind(related_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn status_counts(&self, now: DateTime<Utc>) -> anyhow::Result<StatusCounts> {
        let (pending, due, sent, failed): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending'),
                COUNT(*) FILTER (WHERE status = 'pending' AND send_at <= $1),
                COUNT(*) FILTER (WHERE status = 'sent'),
                COUNT(*) FILTER (WHERE status = 'failed')
            FROM scheduled_emails
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(StatusCounts {
            pending,
            due,
            sent,
            failed,
        })
    }

    // ----------------------------
    // Manual re-enqueue
    // ----------------------------

    /// Copy a `failed` record into a fresh `pending` one. The failed row is
    /// left untouched; the copy points back at it through `replay_of_id`.
    pub async fn requeue_failed(
        &self,
        id: Uuid,
        send_at: DateTime<Utc>,
    ) -> anyhow::Result<RequeueOutcome> {
        let mut tx = self.pool.begin().await?;

        let src = sqlx::query_as::<_, ScheduledEmail>(
            "SELECT * FROM scheduled_emails WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(src) = src else {
            tx.commit().await?;
            return Ok(RequeueOutcome::NotFound);
        };

        if src.status() != Some(EmailStatus::Failed) {
            tx.commit().await?;
            return Ok(RequeueOutcome::NotFailed(src.status));
        }

        let new_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO scheduled_emails (
                id, email_type, email, related_type, related_id,
                send_at, status, replay_of_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            "#,
        )
        .bind(new_id)
        .bind(&src.email_type)
        .bind(&src.email)
        .bind(&src.related_type)
        .bind(src.related_id)
        .bind(send_at)
        .bind(src.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RequeueOutcome::Requeued(new_id))
    }
}

async fn insert<'e, E>(
    executor: E,
    id: Uuid,
    new: &NewScheduledEmail,
) -> anyhow::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO scheduled_emails (
            id, email_type, email, related_type, related_id,
            send_at, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(new.email_type.as_str())
    .bind(&new.email)
    .bind(new.related.related_type())
    .bind(new.related.related_id())
    .bind(new.send_at)
    .bind(EmailStatus::Pending.as_str())
    .execute(executor)
    .await?;

    Ok(())
}

#[async_trait]
impl EmailStore for ScheduledEmailsRepo {
    async fn due_page(
        &self,
        now: DateTime<Utc>,
        after: Option<PageCursor>,
        limit: i64,
    ) -> anyhow::Result<Vec<ScheduledEmail>> {
        let rows = sqlx::query_as::<_, ScheduledEmail>(
            r#"
            SELECT *
            FROM scheduled_emails
            WHERE status = 'pending'
              AND send_at <= $1
              AND ($2::timestamptz IS NULL OR (send_at, id) > ($2::timestamptz, $3::uuid))
            ORDER BY send_at ASC, id ASC
            LIMIT $4
            "#,
        )
        .bind(now)
        .bind(after.map(|c| c.send_at))
        .bind(after.map(|c| c.id))
        .bind(limit.max(1))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn current_status(&self, id: Uuid) -> anyhow::Result<Option<EmailStatus>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM scheduled_emails WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(status.as_deref().and_then(EmailStatus::parse))
    }

    async fn mark_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE scheduled_emails
            SET status = 'sent',
                sent_at = $2,
                error_message = NULL,
                updated_at = now()
            WHERE id = $1
              AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        failed_at: DateTime<Utc>,
        error_message: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE scheduled_emails
            SET status = 'failed',
                sent_at = $2,
                error_message = $3,
                updated_at = now()
            WHERE id = $1
              AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(failed_at)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }
}
