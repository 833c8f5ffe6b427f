use async_trait::async_trait;
use tracing::{debug, info};

use super::{Mailer, OutgoingMail};

/// Development transport: nothing leaves the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        info!(to = %mail.to, subject = %mail.subject, "mail (log transport)");
        debug!(body = %mail.body, "mail body");
        Ok(())
    }
}
