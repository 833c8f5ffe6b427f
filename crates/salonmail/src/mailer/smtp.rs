use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Mailer, OutgoingMail};
use crate::config::SmtpConfig;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig, from: &str, from_name: Option<String>) -> anyhow::Result<Self> {
        let address: Address = from
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid SALONMAIL_MAIL_FROM {from:?}: {e}"))?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?.port(smtp.port);

        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            // app passwords are often pasted with spaces
            let password: String = password.chars().filter(|c| !c.is_whitespace()).collect();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        Ok(Self {
            transport: builder.build(),
            from: Mailbox::new(from_name, address),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        let to: Mailbox = mail.to.trim().parse()?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())?;

        self.transport.send(message).await?;
        Ok(())
    }
}
