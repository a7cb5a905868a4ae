use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::config::{Config, Secrets};
use crate::error::{Error, Result};

/// Sends each message over its own authenticated STARTTLS session.
pub struct SmtpMailer {
    host: String,
    port: u16,
    from: String,
    credentials: Credentials,
}

impl SmtpMailer {
    pub fn new(config: &Config) -> Result<Self> {
        let address = Secrets::require(&config.secrets.email_address, "EMAIL_ADDRESS")?;
        let password = Secrets::require(&config.secrets.email_password, "EMAIL_PASSWORD")?;

        Ok(Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            from: address.to_string(),
            credentials: Credentials::new(address.to_string(), password.to_string()),
        })
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = build_message(&self.from, to, subject, body)?;
        let smtp_error = |e: lettre::transport::smtp::Error| Error::Smtp {
            recipient: to.to_string(),
            reason: e.to_string(),
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .map_err(smtp_error)?
            .port(self.port)
            .credentials(self.credentials.clone())
            .build();

        debug!("Opening SMTP session to {}:{} for {}", self.host, self.port, to);
        transport.send(message).await.map_err(smtp_error)?;

        Ok(())
    }
}

pub fn build_message(from: &str, to: &str, subject: &str, body: &str) -> Result<Message> {
    let address_error = |e: lettre::address::AddressError| Error::Smtp {
        recipient: to.to_string(),
        reason: e.to_string(),
    };

    let from: Mailbox = from.parse().map_err(address_error)?;
    let to_mailbox: Mailbox = to.parse().map_err(address_error)?;

    Message::builder()
        .from(from)
        .to(to_mailbox)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| Error::Smtp {
            recipient: to.to_string(),
            reason: e.to_string(),
        })
}
