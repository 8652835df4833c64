//! Email delivery for magic links.
//!
//! Two transports, chosen once from configuration:
//! - `smtp`: sends through an SMTP relay with lettre
//! - `mock`: records messages in memory and logs them

use async_trait::async_trait;
use domain::repositories::{MailError, Mailer, OutgoingEmail, SentEmail};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{EmailConfig, EmailTransportKind};

/// Errors building the email service from configuration.
#[derive(Debug, thiserror::Error)]
pub enum EmailSetupError {
    #[error("Invalid sender address: {0}")]
    InvalidSender(String),

    #[error("Failed to create SMTP transport: {0}")]
    Transport(String),
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Mock(Arc<Mutex<Vec<OutgoingEmail>>>),
}

/// Mail transport injected into the magic-link service.
pub struct EmailService {
    transport: EmailTransport,
    from: Mailbox,
}

impl EmailService {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailSetupError> {
        let from = format!("{} <{}>", config.sender_name, config.sender_email)
            .parse::<Mailbox>()
            .map_err(|e| EmailSetupError::InvalidSender(e.to_string()))?;

        let transport = match config.transport {
            EmailTransportKind::Smtp => {
                if !config.smtp_use_tls {
                    warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let builder = if config.smtp_use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                        .map_err(|e| EmailSetupError::Transport(e.to_string()))?
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                }
                .port(config.smtp_port);

                let builder = if config.smtp_username.is_empty() {
                    builder
                } else {
                    builder.credentials(Credentials::new(
                        config.smtp_username.clone(),
                        config.smtp_password.clone(),
                    ))
                };

                info!(host = %config.smtp_host, port = config.smtp_port, "Using SMTP email transport");
                EmailTransport::Smtp(builder.build())
            }
            EmailTransportKind::Mock => {
                info!("Using mock email transport");
                EmailTransport::Mock(Arc::new(Mutex::new(Vec::new())))
            }
        };

        Ok(Self { transport, from })
    }

    /// Messages recorded by the mock transport, oldest first.
    ///
    /// Always empty for SMTP.
    pub fn sent_messages(&self) -> Vec<OutgoingEmail> {
        match &self.transport {
            EmailTransport::Mock(outbox) => outbox
                .lock()
                .map(|messages| messages.clone())
                .unwrap_or_default(),
            EmailTransport::Smtp(_) => Vec::new(),
        }
    }

    fn build_message(&self, email: &OutgoingEmail, message_id: &str) -> Result<Message, MailError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| MailError::DeliveryFailed(format!("invalid recipient: {e}")))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .message_id(Some(message_id.to_string()));

        let message = match &email.text_body {
            Some(text) => builder.multipart(MultiPart::alternative_plain_html(
                text.clone(),
                email.html_body.clone(),
            )),
            None => builder
                .header(ContentType::TEXT_HTML)
                .body(email.html_body.clone()),
        };

        message.map_err(|e| MailError::DeliveryFailed(format!("build email message: {e}")))
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send(&self, email: OutgoingEmail) -> Result<SentEmail, MailError> {
        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                let message_id = format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain());
                let message = self.build_message(&email, &message_id)?;
                smtp.send(message)
                    .await
                    .map_err(|e| MailError::DeliveryFailed(format!("send SMTP email: {e}")))?;

                debug!(to = %email.to, message_id = %message_id, "Email sent via SMTP");
                Ok(SentEmail { message_id })
            }
            EmailTransport::Mock(outbox) => {
                let message_id = format!("mock-{}", Uuid::new_v4());
                info!(
                    to = %email.to,
                    subject = %email.subject,
                    message_id = %message_id,
                    "Email recorded by mock transport"
                );
                outbox
                    .lock()
                    .map_err(|_| MailError::DeliveryFailed("mock outbox poisoned".to_string()))?
                    .push(email);
                Ok(SentEmail { message_id })
            }
        }
    }
}
