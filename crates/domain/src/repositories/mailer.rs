//! Outbound email contract.

use async_trait::async_trait;
use thiserror::Error;

/// A message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
}

/// Transport acknowledgement for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub message_id: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Email delivery failed: {0}")]
    DeliveryFailed(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<SentEmail, MailError>;
}
