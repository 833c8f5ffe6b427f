use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;

pub mod log;
pub mod smtp;

pub use self::log::LogMailer;
pub use self::smtp::SmtpMailer;

/// A fully rendered plain-text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()>;
}

/// SMTP when a host is configured, otherwise the log-only transport.
pub fn from_config(cfg: &Config) -> anyhow::Result<Arc<dyn Mailer>> {
    match &cfg.smtp {
        Some(smtp) => Ok(Arc::new(SmtpMailer::new(
            smtp,
            &cfg.mail_from,
            cfg.mail_from_name.clone(),
        )?)),
        None => {
            tracing::warn!("SALONMAIL_SMTP_HOST not set; mail will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}
