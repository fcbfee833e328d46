//! Message assembly and the build-once state machine.
//!
//! [`MessageAssembler`] turns [`MessageParts`] into an immutable
//! [`AssembledMessage`]. Checks run in a fixed order: assembly state,
//! session resolution, sender, recipients. Only a successful call moves the
//! assembler to [`AssemblyState::Assembled`].

use std::sync::Arc;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::errors::{MailError, MailErrorKind, MailResult};
use crate::headers::HeaderStore;
use crate::mime::{Charset, Content, MimeWriter};
use crate::recipients::RecipientRegistry;
use crate::session::{Session, SessionResolver};
use crate::types::{Address, RecipientRole};

/// Assembly lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblyState {
    /// Not assembled yet.
    #[default]
    Draft,
    /// Assembled once; terminal.
    Assembled,
}

/// Everything a message is assembled from.
#[derive(Debug, Clone, Default)]
pub struct MessageParts {
    /// Sender.
    pub from: Option<Address>,
    /// To, Cc, Bcc and Reply-To addresses.
    pub recipients: RecipientRegistry,
    /// Custom headers.
    pub headers: HeaderStore,
    /// Subject line.
    pub subject: Option<String>,
    /// Charset for the subject, encoded headers and text content.
    pub charset: Option<Charset>,
    /// Body.
    pub content: Option<Content>,
    /// Sent date; None means "now" at assembly.
    pub sent_date: Option<DateTime<Utc>>,
    /// Session configuration.
    pub session: SessionConfig,
}

/// Owns the build-once state.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    state: AssemblyState,
}

impl MessageAssembler {
    /// Creates an assembler in the draft state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn state(&self) -> AssemblyState {
        self.state
    }

    /// Assembles `parts` into a message.
    ///
    /// Fails with `AlreadyAssembled` on every call after the first
    /// successful one. Any other failure leaves the state untouched.
    pub fn assemble(&mut self, parts: &MessageParts) -> MailResult<AssembledMessage> {
        if self.state == AssemblyState::Assembled {
            #[cfg(feature = "tracing")]
            tracing::warn!("Rejected second assembly of the same draft");
            return Err(MailError::already_assembled());
        }

        let message = match Self::build(parts) {
            Ok(message) => message,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(kind = %e.kind(), error = %e, "Message assembly failed");
                return Err(e);
            }
        };

        self.state = AssemblyState::Assembled;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            message_id = %message.message_id(),
            recipients = message.recipient_count(),
            host = message.session().host().unwrap_or("-"),
            "Assembled message"
        );

        Ok(message)
    }

    fn build(parts: &MessageParts) -> MailResult<AssembledMessage> {
        let session = SessionResolver::resolve(&parts.session)?;

        let from = parts.from.clone().ok_or_else(|| {
            MailError::new(MailErrorKind::MissingSender, "From address required")
        })?;

        if parts.recipients.has_no_recipients() {
            return Err(MailError::new(
                MailErrorKind::MissingRecipient,
                "At least one To, Cc or Bcc address required",
            ));
        }

        let sent_date = parts.sent_date.unwrap_or_else(Utc::now);

        let message_id = match parts.headers.get("Message-ID") {
            Some(id) => id.to_string(),
            None => generate_message_id(&session, &from, sent_date),
        };

        Ok(AssembledMessage {
            session,
            from,
            to: parts.recipients.get(RecipientRole::To).to_vec(),
            cc: parts.recipients.get(RecipientRole::Cc).to_vec(),
            bcc: parts.recipients.get(RecipientRole::Bcc).to_vec(),
            reply_to: parts.recipients.get(RecipientRole::ReplyTo).to_vec(),
            subject: parts.subject.clone(),
            charset: parts.charset.clone(),
            content: parts.content.clone(),
            sent_date,
            headers: parts.headers.clone(),
            message_id,
        })
    }
}

/// Generates `<uuid.timestamp@domain>`, preferring the session host.
fn generate_message_id(session: &Session, from: &Address, date: DateTime<Utc>) -> String {
    let domain = session.host().unwrap_or_else(|| from.domain());
    format!("<{}.{}@{}>", Uuid::new_v4().simple(), date.timestamp(), domain)
}

/// Immutable, wire-ready message.
#[derive(Debug, Clone)]
pub struct AssembledMessage {
    session: Arc<Session>,
    from: Address,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    reply_to: Vec<Address>,
    subject: Option<String>,
    charset: Option<Charset>,
    content: Option<Content>,
    sent_date: DateTime<Utc>,
    headers: HeaderStore,
    message_id: String,
}

impl AssembledMessage {
    /// Returns the resolved session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Returns the sender.
    pub fn from(&self) -> &Address {
        &self.from
    }

    /// Returns the To recipients.
    pub fn to(&self) -> &[Address] {
        &self.to
    }

    /// Returns the Cc recipients.
    pub fn cc(&self) -> &[Address] {
        &self.cc
    }

    /// Returns the Bcc recipients.
    pub fn bcc(&self) -> &[Address] {
        &self.bcc
    }

    /// Returns the Reply-To addresses.
    pub fn reply_to(&self) -> &[Address] {
        &self.reply_to
    }

    /// Returns the subject.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Returns the charset.
    pub fn charset(&self) -> Option<&Charset> {
        self.charset.as_ref()
    }

    /// Returns the body.
    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    /// Returns the resolved sent date.
    pub fn sent_date(&self) -> DateTime<Utc> {
        self.sent_date
    }

    /// Returns the custom headers.
    pub fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    /// Returns the Message-ID header value.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Returns every delivery recipient (To, Cc, Bcc).
    pub fn recipients(&self) -> impl Iterator<Item = &Address> {
        self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter())
    }

    /// Returns the number of delivery recipients.
    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }

    /// Returns the envelope sender: the session bounce address, else From.
    pub fn envelope_from(&self) -> &Address {
        self.session.bounce_address().unwrap_or(&self.from)
    }

    /// Renders the message in RFC 5322 form.
    pub fn to_bytes(&self) -> Vec<u8> {
        MimeWriter::render(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn complete_parts() -> MessageParts {
        let mut parts = MessageParts::default();
        parts.session.host = Some("localhost".to_string());
        parts.from = Some(Address::parse("abc@gmail.com").unwrap());
        parts.recipients.add(RecipientRole::To, "def@gmail.com", None).unwrap();
        parts
    }

    #[test]
    fn test_assemble_once() {
        let mut assembler = MessageAssembler::new();
        let parts = complete_parts();

        let message = assembler.assemble(&parts).unwrap();
        assert_eq!(assembler.state(), AssemblyState::Assembled);
        assert_eq!(message.from().email(), "abc@gmail.com");
        assert_eq!(message.recipient_count(), 1);

        let err = assembler.assemble(&parts).unwrap_err();
        assert_eq!(err.kind(), MailErrorKind::AlreadyAssembled);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_check_order_host_first() {
        let mut assembler = MessageAssembler::new();
        let err = assembler.assemble(&MessageParts::default()).unwrap_err();
        assert_eq!(err.kind(), MailErrorKind::MissingHost);
    }

    #[test]
    fn test_missing_sender_then_retry() {
        let mut assembler = MessageAssembler::new();
        let mut parts = complete_parts();
        parts.from = None;

        let err = assembler.assemble(&parts).unwrap_err();
        assert_eq!(err.kind(), MailErrorKind::MissingSender);
        assert_eq!(assembler.state(), AssemblyState::Draft);

        parts.from = Some(Address::parse("abc@gmail.com").unwrap());
        assert!(assembler.assemble(&parts).is_ok());
    }

    #[test]
    fn test_reply_to_alone_is_not_a_recipient() {
        let mut assembler = MessageAssembler::new();
        let mut parts = complete_parts();
        parts.recipients = RecipientRegistry::new();
        parts.recipients.add(RecipientRole::ReplyTo, "mno@gmail.com", None).unwrap();

        let err = assembler.assemble(&parts).unwrap_err();
        assert_eq!(err.kind(), MailErrorKind::MissingRecipient);
    }

    #[test]
    fn test_bcc_only_is_enough() {
        let mut parts = complete_parts();
        parts.recipients = RecipientRegistry::new();
        parts.recipients.add(RecipientRole::Bcc, "ghi@gmail.com", None).unwrap();

        let message = MessageAssembler::new().assemble(&parts).unwrap();
        assert_eq!(message.bcc().len(), 1);
        assert!(message.to().is_empty());
    }

    #[test]
    fn test_explicit_sent_date_kept() {
        let date = Utc.with_ymd_and_hms(2023, 4, 11, 13, 45, 0).unwrap();
        let mut parts = complete_parts();
        parts.sent_date = Some(date);

        let message = MessageAssembler::new().assemble(&parts).unwrap();
        assert_eq!(message.sent_date(), date);
    }

    #[test]
    fn test_missing_sent_date_resolves_to_now() {
        let before = Utc::now();
        let message = MessageAssembler::new().assemble(&complete_parts()).unwrap();
        let after = Utc::now();

        assert!(message.sent_date() >= before && message.sent_date() <= after);
    }

    #[test]
    fn test_message_id() {
        let message = MessageAssembler::new().assemble(&complete_parts()).unwrap();
        assert!(message.message_id().starts_with('<'));
        assert!(message.message_id().ends_with("@localhost>"));

        let mut parts = complete_parts();
        parts.headers.add("Message-ID", "<fixed@example.com>").unwrap();
        let message = MessageAssembler::new().assemble(&parts).unwrap();
        assert_eq!(message.message_id(), "<fixed@example.com>");
    }

    #[test]
    fn test_envelope_from_prefers_bounce_address() {
        let mut parts = complete_parts();
        let message = MessageAssembler::new().assemble(&parts).unwrap();
        assert_eq!(message.envelope_from().email(), "abc@gmail.com");

        parts.session.bounce_address = Some(Address::parse("bounce@gmail.com").unwrap());
        let message = MessageAssembler::new().assemble(&parts).unwrap();
        assert_eq!(message.envelope_from().email(), "bounce@gmail.com");
    }

    #[test]
    fn test_message_independent_of_parts() {
        let mut parts = complete_parts();
        let message = MessageAssembler::new().assemble(&parts).unwrap();

        parts.recipients.add(RecipientRole::To, "late@gmail.com", None).unwrap();
        parts.subject = Some("changed".to_string());

        assert_eq!(message.to().len(), 1);
        assert_eq!(message.subject(), None);
    }
}
