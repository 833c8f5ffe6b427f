pub mod dispatcher;
pub mod error;
pub mod lock;
pub mod model;
pub mod related;
pub mod repo;
pub mod schedule;
pub mod store;
pub mod templates;

pub use dispatcher::{DispatchConfig, DispatchReport, Dispatcher};
pub use error::DispatchError;
pub use lock::PgRunLock;
pub use model::{EmailStatus, EmailType, NewScheduledEmail, PageCursor, ScheduledEmail};
pub use related::{PgRelatedLookup, Related, RelatedLookup, RelatedRef};
pub use repo::{RequeueOutcome, ScheduledEmailsRepo, StatusCounts};
pub use schedule::{plan_for_reservation, SchedulePolicy};
pub use store::{EmailStore, RunLock};
pub use templates::TemplateResolver;

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::mailer;
use crate::reservations::ReservationsRepo;

/// Production wiring: Postgres store, lookup and advisory lock, mailer from config.
pub fn dispatcher_from_config(pool: &PgPool, cfg: &Config) -> anyhow::Result<Dispatcher> {
    Ok(Dispatcher::new(
        Arc::new(ScheduledEmailsRepo::new(pool.clone())),
        Arc::new(PgRelatedLookup::new(ReservationsRepo::new(pool.clone()))),
        mailer::from_config(cfg)?,
        Arc::new(PgRunLock::new(pool.clone(), cfg.lock_key)),
        TemplateResolver::new(cfg.shop_name.clone()),
        cfg.dispatch_config(),
    ))
}
