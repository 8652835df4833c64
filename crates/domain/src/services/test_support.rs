//! Shared fixtures for service tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::repositories::{MailError, Mailer, OutgoingEmail, SentEmail};

/// Mailer that keeps every message and can be switched to fail.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail: AtomicBool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<SentEmail, MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::DeliveryFailed("connection refused".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email);
        Ok(SentEmail {
            message_id: format!("test-{}", sent.len()),
        })
    }
}
