//! Mock implementations for testing.
//!
//! Provides a recording sink and ready-to-build drafts.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::assembler::AssembledMessage;
use crate::draft::DraftMessage;
use crate::errors::{MailError, MailResult};
use crate::transport::MessageSink;

/// Sink that keeps every delivered message in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    /// Delivered messages.
    delivered: Arc<Mutex<Vec<AssembledMessage>>>,
    /// Simulate failure.
    fail_next: Arc<Mutex<Option<MailError>>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the next delivery to fail.
    pub fn fail_next_with(&self, error: MailError) -> &Self {
        *self.fail_next.lock().unwrap() = Some(error);
        self
    }

    /// Returns the delivered messages.
    pub fn delivered(&self) -> Vec<AssembledMessage> {
        self.delivered.lock().unwrap().clone()
    }

    /// Returns the number of delivered messages.
    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }

    /// Clears recorded data.
    pub fn clear(&self) {
        self.delivered.lock().unwrap().clear();
        *self.fail_next.lock().unwrap() = None;
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn deliver(&self, message: &AssembledMessage) -> MailResult<String> {
        if let Some(error) = self.fail_next.lock().unwrap().take() {
            return Err(error);
        }

        self.delivered.lock().unwrap().push(message.clone());
        Ok(message.message_id().to_string())
    }
}

/// Creates a draft that assembles without further changes.
pub fn test_draft() -> MailResult<DraftMessage> {
    let mut draft = DraftMessage::new();
    draft
        .set_host_name("localhost")
        .set_subject("Test Subject");
    draft
        .set_from("sender@example.com")?
        .add_to("recipient@example.com")?;
    Ok(draft)
}

/// Creates a draft with every recipient role, a custom header and a body.
pub fn test_draft_full() -> MailResult<DraftMessage> {
    let mut draft = test_draft()?;
    draft
        .add_cc_named("cc@example.com", "Carbon Copy")?
        .add_bcc("hidden@example.com")?
        .add_reply_to_named("JohnSmith@gmail.com", "John Smith")?
        .add_header("X-Mailer", "Sendmail")?
        .set_content("Test body", "text/plain; charset=UTF-8")?;
    Ok(draft)
}
