use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::emails::error::DispatchError;
use crate::emails::model::{EmailStatus, PageCursor, ScheduledEmail};
use crate::emails::related::{RelatedLookup, RelatedRef};
use crate::emails::store::{EmailStore, RunLock};
use crate::emails::templates::TemplateResolver;
use crate::mailer::Mailer;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub page_size: i64,
    pub send_timeout: Duration,
    /// Attempts at the terminal write before a record is given up on for this run.
    pub write_attempts: u32,
    /// Base delay between terminal-write attempts, multiplied by the attempt number.
    pub write_backoff: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            send_timeout: Duration::from_secs(30),
            write_attempts: 3,
            write_backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Another run held the lock; nothing was touched.
    pub lock_busy: bool,
    pub selected: u64,
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Store errors while handling a single record. The record stays `pending`.
    pub errored: u64,
}

enum Outcome {
    Sent,
    Failed,
    Skipped,
}

#[derive(Clone, Copy)]
enum Terminal<'a> {
    Sent,
    Failed(&'a str),
}

/// One batch run over due `pending` records.
///
/// Records are processed one at a time in `(send_at, id)` order. A record's
/// problem becomes its own `failed` row and never stops the batch. A store
/// error while handling one record is logged and counted, and the batch moves
/// on; only a failed page read aborts the run.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn EmailStore>,
    related: Arc<dyn RelatedLookup>,
    mailer: Arc<dyn Mailer>,
    lock: Arc<dyn RunLock>,
    resolver: TemplateResolver,
    cfg: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn EmailStore>,
        related: Arc<dyn RelatedLookup>,
        mailer: Arc<dyn Mailer>,
        lock: Arc<dyn RunLock>,
        resolver: TemplateResolver,
        cfg: DispatchConfig,
    ) -> Self {
        Self {
            store,
            related,
            mailer,
            lock,
            resolver,
            cfg,
        }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> anyhow::Result<DispatchReport> {
        if !self.lock.try_acquire().await? {
            info!("previous dispatch run still active, skipping");
            return Ok(DispatchReport {
                lock_busy: true,
                ..DispatchReport::default()
            });
        }

        let res = self.run_locked(now).await;

        if let Err(e) = self.lock.release().await {
            warn!(error = %e, "failed to release dispatch lock");
        }

        res
    }

    async fn run_locked(&self, now: DateTime<Utc>) -> anyhow::Result<DispatchReport> {
        let page_size = self.cfg.page_size.max(1);
        let mut report = DispatchReport::default();
        let mut cursor: Option<PageCursor> = None;

        loop {
            let page = self.store.due_page(now, cursor, page_size).await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(PageCursor::after(last));
            let is_last_page = (page.len() as i64) < page_size;

            for record in &page {
                report.selected += 1;
                match self.process(record, now).await {
                    Ok(Outcome::Sent) => report.sent += 1,
                    Ok(Outcome::Failed) => report.failed += 1,
                    Ok(Outcome::Skipped) => report.skipped += 1,
                    Err(e) => {
                        error!(
                            email_id = %record.id,
                            email_type = %record.email_type,
                            error = %e,
                            "store error while processing scheduled email"
                        );
                        report.errored += 1;
                    }
                }
            }

            if is_last_page {
                break;
            }
        }

        if report.selected > 0 {
            info!(
                selected = report.selected,
                sent = report.sent,
                failed = report.failed,
                skipped = report.skipped,
                errored = report.errored,
                "dispatch run finished"
            );
        }

        Ok(report)
    }

    async fn process(&self, record: &ScheduledEmail, now: DateTime<Utc>) -> anyhow::Result<Outcome> {
        // Re-read: an overlapping writer may have finished this row since the page was read.
        if self.store.current_status(record.id).await? != Some(EmailStatus::Pending) {
            return Ok(Outcome::Skipped);
        }

        match self.deliver(record).await {
            Ok(()) => {
                let marked = self
                    .finish(record, now, Terminal::Sent)
                    .await
                    .inspect_err(|e| {
                        error!(
                            email_id = %record.id,
                            email_type = %record.email_type,
                            email = %record.email,
                            error = %e,
                            "mail was delivered but the record could not be marked sent; \
                             it stays pending and will be delivered again unless fixed by hand"
                        );
                    })?;
                if !marked {
                    warn!(email_id = %record.id, "sent, but record was no longer pending");
                    return Ok(Outcome::Skipped);
                }
                info!(
                    email_id = %record.id,
                    email_type = %record.email_type,
                    related_type = %record.related_type,
                    related_id = record.related_id,
                    "scheduled email sent"
                );
                Ok(Outcome::Sent)
            }
            Err(err) => {
                let message = err.to_string();
                if err.is_warning() {
                    warn!(
                        email_id = %record.id,
                        email_type = %record.email_type,
                        related_type = %record.related_type,
                        related_id = record.related_id,
                        kind = err.kind(),
                        error = %message,
                        "scheduled email not sendable"
                    );
                } else {
                    error!(
                        email_id = %record.id,
                        email_type = %record.email_type,
                        kind = err.kind(),
                        error = %message,
                        "scheduled email send failed"
                    );
                }

                if !self
                    .finish(record, now, Terminal::Failed(&message))
                    .await?
                {
                    return Ok(Outcome::Skipped);
                }
                Ok(Outcome::Failed)
            }
        }
    }

    /// Terminal write with bounded retries. A delivered mail must not stay
    /// `pending` over a transient store hiccup.
    async fn finish(
        &self,
        record: &ScheduledEmail,
        now: DateTime<Utc>,
        terminal: Terminal<'_>,
    ) -> anyhow::Result<bool> {
        let attempts = self.cfg.write_attempts.max(1);
        let mut attempt = 1;

        loop {
            let res = match terminal {
                Terminal::Sent => self.store.mark_sent(record.id, now).await,
                Terminal::Failed(message) => self.store.mark_failed(record.id, now, message).await,
            };

            match res {
                Ok(changed) => return Ok(changed),
                Err(e) if attempt < attempts => {
                    warn!(
                        email_id = %record.id,
                        attempt,
                        error = %e,
                        "terminal write failed, retrying"
                    );
                    tokio::time::sleep(self.cfg.write_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn deliver(&self, record: &ScheduledEmail) -> Result<(), DispatchError> {
        let related_ref = RelatedRef::parse(&record.related_type, record.related_id)?;

        let related = self
            .related
            .find(&related_ref)
            .await
            .map_err(|e| DispatchError::Lookup(e.to_string()))?
            .ok_or(DispatchError::RelatedNotFound)?;

        let send = self.resolver.send(self.mailer.as_ref(), record, &related);
        match timeout(self.cfg.send_timeout, send).await {
            Ok(res) => res,
            Err(_) => Err(DispatchError::Timeout(self.cfg.send_timeout)),
        }
    }
}
