//! The caller-facing draft message.
//!
//! A [`DraftMessage`] is configured field by field in any order, then
//! finalized once with [`DraftMessage::build_message`]. Every setter
//! validates its input immediately and leaves the draft unchanged when it
//! fails.

use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::assembler::{AssembledMessage, AssemblyState, MessageAssembler, MessageParts};
use crate::config::SessionConfig;
use crate::errors::{MailError, MailResult};
use crate::headers::HeaderStore;
use crate::mime::{Charset, Content};
use crate::recipients::RecipientRegistry;
use crate::session::{Session, SessionResolver};
use crate::transport::MessageSink;
use crate::types::{Address, RecipientRole};

/// A message under construction.
#[derive(Debug, Default)]
pub struct DraftMessage {
    parts: MessageParts,
    assembler: MessageAssembler,
}

impl DraftMessage {
    /// Creates an empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty draft using `config` for session resolution.
    pub fn with_session_config(config: SessionConfig) -> Self {
        Self {
            parts: MessageParts {
                session: config,
                ..Default::default()
            },
            assembler: MessageAssembler::new(),
        }
    }

    // Sender

    /// Sets the sender.
    pub fn set_from(&mut self, email: &str) -> MailResult<&mut Self> {
        self.parts.from = Some(Address::parse(email)?);
        Ok(self)
    }

    /// Sets the sender with a display name.
    pub fn set_from_named(&mut self, email: &str, name: &str) -> MailResult<&mut Self> {
        self.parts.from = Some(Address::with_name(name, email)?);
        Ok(self)
    }

    /// Returns the sender.
    pub fn from_address(&self) -> Option<&Address> {
        self.parts.from.as_ref()
    }

    // Recipients

    /// Adds a To recipient.
    pub fn add_to(&mut self, email: &str) -> MailResult<&mut Self> {
        self.add(RecipientRole::To, email, None)
    }

    /// Adds a To recipient with a display name.
    pub fn add_to_named(&mut self, email: &str, name: &str) -> MailResult<&mut Self> {
        self.add(RecipientRole::To, email, Some(name))
    }

    /// Adds several To recipients; all or none are added.
    pub fn add_to_all<I, S>(&mut self, emails: I) -> MailResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parts.recipients.add_all(RecipientRole::To, emails)?;
        Ok(self)
    }

    /// Adds a Cc recipient.
    pub fn add_cc(&mut self, email: &str) -> MailResult<&mut Self> {
        self.add(RecipientRole::Cc, email, None)
    }

    /// Adds a Cc recipient with a display name.
    pub fn add_cc_named(&mut self, email: &str, name: &str) -> MailResult<&mut Self> {
        self.add(RecipientRole::Cc, email, Some(name))
    }

    /// Adds several Cc recipients; all or none are added.
    pub fn add_cc_all<I, S>(&mut self, emails: I) -> MailResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parts.recipients.add_all(RecipientRole::Cc, emails)?;
        Ok(self)
    }

    /// Adds a Bcc recipient.
    pub fn add_bcc(&mut self, email: &str) -> MailResult<&mut Self> {
        self.add(RecipientRole::Bcc, email, None)
    }

    /// Adds a Bcc recipient with a display name.
    pub fn add_bcc_named(&mut self, email: &str, name: &str) -> MailResult<&mut Self> {
        self.add(RecipientRole::Bcc, email, Some(name))
    }

    /// Adds several Bcc recipients; all or none are added.
    pub fn add_bcc_all<I, S>(&mut self, emails: I) -> MailResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parts.recipients.add_all(RecipientRole::Bcc, emails)?;
        Ok(self)
    }

    /// Adds a Reply-To address.
    pub fn add_reply_to(&mut self, email: &str) -> MailResult<&mut Self> {
        self.add(RecipientRole::ReplyTo, email, None)
    }

    /// Adds a Reply-To address with a display name.
    pub fn add_reply_to_named(&mut self, email: &str, name: &str) -> MailResult<&mut Self> {
        self.add(RecipientRole::ReplyTo, email, Some(name))
    }

    /// Replaces the To recipients.
    pub fn set_to(&mut self, addresses: Vec<Address>) -> MailResult<&mut Self> {
        self.parts.recipients.replace(RecipientRole::To, addresses)?;
        Ok(self)
    }

    /// Replaces the Cc recipients.
    pub fn set_cc(&mut self, addresses: Vec<Address>) -> MailResult<&mut Self> {
        self.parts.recipients.replace(RecipientRole::Cc, addresses)?;
        Ok(self)
    }

    /// Replaces the Bcc recipients.
    pub fn set_bcc(&mut self, addresses: Vec<Address>) -> MailResult<&mut Self> {
        self.parts.recipients.replace(RecipientRole::Bcc, addresses)?;
        Ok(self)
    }

    /// Replaces the Reply-To addresses.
    pub fn set_reply_to(&mut self, addresses: Vec<Address>) -> MailResult<&mut Self> {
        self.parts.recipients.replace(RecipientRole::ReplyTo, addresses)?;
        Ok(self)
    }

    /// Returns the To recipients.
    pub fn to_addresses(&self) -> &[Address] {
        self.parts.recipients.get(RecipientRole::To)
    }

    /// Returns the Cc recipients.
    pub fn cc_addresses(&self) -> &[Address] {
        self.parts.recipients.get(RecipientRole::Cc)
    }

    /// Returns the Bcc recipients.
    pub fn bcc_addresses(&self) -> &[Address] {
        self.parts.recipients.get(RecipientRole::Bcc)
    }

    /// Returns the Reply-To addresses.
    pub fn reply_to_addresses(&self) -> &[Address] {
        self.parts.recipients.get(RecipientRole::ReplyTo)
    }

    /// Returns the whole recipient registry.
    pub fn recipients(&self) -> &RecipientRegistry {
        &self.parts.recipients
    }

    fn add(&mut self, role: RecipientRole, email: &str, name: Option<&str>) -> MailResult<&mut Self> {
        self.parts.recipients.add(role, email, name)?;
        Ok(self)
    }

    // Headers

    /// Adds or overwrites a custom header.
    pub fn add_header(&mut self, name: &str, value: &str) -> MailResult<&mut Self> {
        self.parts.headers.add(name, value)?;
        Ok(self)
    }

    /// Replaces every custom header.
    pub fn set_headers<I, N, V>(&mut self, headers: I) -> MailResult<&mut Self>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        self.parts.headers.replace_all(headers)?;
        Ok(self)
    }

    /// Returns the custom headers.
    pub fn headers(&self) -> &HeaderStore {
        &self.parts.headers
    }

    // Subject, charset, content, date

    /// Sets the subject.
    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.parts.subject = Some(subject.into());
        self
    }

    /// Returns the subject.
    pub fn subject(&self) -> Option<&str> {
        self.parts.subject.as_deref()
    }

    /// Sets the charset; unknown names fail with `InvalidCharset`.
    pub fn set_charset(&mut self, charset: &str) -> MailResult<&mut Self> {
        self.parts.charset = Some(Charset::new(charset)?);
        Ok(self)
    }

    /// Returns the charset.
    pub fn charset(&self) -> Option<&Charset> {
        self.parts.charset.as_ref()
    }

    /// Sets the body and its content type.
    ///
    /// A `charset` parameter on the content type becomes the draft charset
    /// when none has been set.
    pub fn set_content(&mut self, body: impl Into<String>, content_type: &str) -> MailResult<&mut Self> {
        let content = Content::new(body, content_type)?;

        let adopted = match (&self.parts.charset, content.charset_param()) {
            (None, Some(label)) => Some(Charset::new(label)?),
            _ => None,
        };

        if adopted.is_some() {
            self.parts.charset = adopted;
        }
        self.parts.content = Some(content);
        Ok(self)
    }

    /// Returns the body.
    pub fn content(&self) -> Option<&Content> {
        self.parts.content.as_ref()
    }

    /// Sets the sent date; None means "now" when read or assembled.
    pub fn set_sent_date(&mut self, date: Option<DateTime<Utc>>) -> &mut Self {
        self.parts.sent_date = date;
        self
    }

    /// Returns the sent date, or the current time when none is set.
    pub fn sent_date(&self) -> DateTime<Utc> {
        self.parts.sent_date.unwrap_or_else(Utc::now)
    }

    // Session

    /// Sets the SMTP host.
    pub fn set_host_name(&mut self, host: impl Into<String>) -> &mut Self {
        self.parts.session.host = Some(host.into());
        self
    }

    /// Returns the explicit session's host if a session is set, else the
    /// configured host, else None.
    pub fn host_name(&self) -> Option<String> {
        SessionResolver::host_name(&self.parts.session)
    }

    /// Sets the plain SMTP port.
    pub fn set_smtp_port(&mut self, port: u16) -> MailResult<&mut Self> {
        if port == 0 {
            return Err(MailError::configuration("Cannot connect to port 0"));
        }
        self.parts.session.smtp_port = port;
        Ok(self)
    }

    /// Returns the plain SMTP port.
    pub fn smtp_port(&self) -> u16 {
        self.parts.session.smtp_port
    }

    /// Sets the SSL SMTP port.
    pub fn set_ssl_smtp_port(&mut self, port: u16) -> MailResult<&mut Self> {
        if port == 0 {
            return Err(MailError::configuration("Cannot connect to port 0"));
        }
        self.parts.session.ssl_smtp_port = port;
        Ok(self)
    }

    /// Returns the SSL SMTP port.
    pub fn ssl_smtp_port(&self) -> u16 {
        self.parts.session.ssl_smtp_port
    }

    /// Supplies a pre-built session, overriding host and port settings.
    pub fn set_mail_session(&mut self, session: Arc<Session>) -> &mut Self {
        self.parts.session.session = Some(session);
        self
    }

    /// Resolves the session this draft would be assembled against.
    pub fn mail_session(&self) -> MailResult<Arc<Session>> {
        SessionResolver::resolve(&self.parts.session)
    }

    /// Enables implicit TLS on connect.
    pub fn set_ssl_on_connect(&mut self, enabled: bool) -> &mut Self {
        self.parts.session.ssl_on_connect = enabled;
        self
    }

    /// Returns true if implicit TLS is enabled.
    pub fn is_ssl_on_connect(&self) -> bool {
        self.parts.session.ssl_on_connect
    }

    /// Enables server identity checks.
    pub fn set_ssl_check_server_identity(&mut self, enabled: bool) -> &mut Self {
        self.parts.session.ssl_check_server_identity = enabled;
        self
    }

    /// Returns true if server identity checks are enabled.
    pub fn is_ssl_check_server_identity(&self) -> bool {
        self.parts.session.ssl_check_server_identity
    }

    /// Enables STARTTLS.
    pub fn set_start_tls_enabled(&mut self, enabled: bool) -> &mut Self {
        self.parts.session.start_tls_enabled = enabled;
        self
    }

    /// Requires STARTTLS.
    pub fn set_start_tls_required(&mut self, required: bool) -> &mut Self {
        self.parts.session.start_tls_required = required;
        self
    }

    /// Sets the bounce address.
    pub fn set_bounce_address(&mut self, email: &str) -> MailResult<&mut Self> {
        self.parts.session.bounce_address = Some(Address::parse(email)?);
        Ok(self)
    }

    /// Returns the bounce address.
    pub fn bounce_address(&self) -> Option<&Address> {
        self.parts.session.bounce_address.as_ref()
    }

    /// Sets plain authentication credentials.
    pub fn set_authentication(&mut self, username: impl Into<String>, password: impl Into<String>) -> &mut Self {
        self.parts.session.username = Some(username.into());
        self.parts.session.password = Some(SecretString::new(password.into()));
        self
    }

    /// Sets the socket connection timeout.
    pub fn set_socket_connection_timeout(&mut self, timeout: Duration) -> MailResult<&mut Self> {
        if timeout.is_zero() {
            return Err(MailError::configuration("Connection timeout must be positive"));
        }
        self.parts.session.connection_timeout = timeout;
        Ok(self)
    }

    /// Returns the socket connection timeout (60 seconds by default).
    pub fn socket_connection_timeout(&self) -> Duration {
        self.parts.session.connection_timeout
    }

    /// Returns the socket connection timeout in milliseconds.
    pub fn socket_connection_timeout_ms(&self) -> u64 {
        u64::try_from(self.parts.session.connection_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Sets the socket read timeout.
    pub fn set_socket_timeout(&mut self, timeout: Duration) -> MailResult<&mut Self> {
        if timeout.is_zero() {
            return Err(MailError::configuration("Socket timeout must be positive"));
        }
        self.parts.session.socket_timeout = timeout;
        Ok(self)
    }

    /// Returns the socket read timeout (60 seconds by default).
    pub fn socket_timeout(&self) -> Duration {
        self.parts.session.socket_timeout
    }

    /// Enables transport debug output.
    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.parts.session.debug = debug;
        self
    }

    /// Returns the session configuration.
    pub fn session_config(&self) -> &SessionConfig {
        &self.parts.session
    }

    // Assembly

    /// Returns the assembly state.
    pub fn state(&self) -> AssemblyState {
        self.assembler.state()
    }

    /// Validates the draft and produces the immutable message.
    ///
    /// Can succeed once per draft; later calls fail with
    /// `AlreadyAssembled`.
    pub fn build_message(&mut self) -> MailResult<AssembledMessage> {
        self.assembler.assemble(&self.parts)
    }

    /// Assembles the draft and hands it to `sink`, returning the message ID.
    pub async fn send<S>(&mut self, sink: &S) -> MailResult<String>
    where
        S: MessageSink + ?Sized,
    {
        let message = self.build_message()?;
        sink.deliver(&message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MailErrorKind;

    #[test]
    fn test_chained_configuration() -> MailResult<()> {
        let mut draft = DraftMessage::new();
        draft
            .set_host_name("localhost")
            .set_subject("Message subject")
            .set_ssl_on_connect(true);
        draft
            .set_from("abc@gmail.com")?
            .add_to("def@gmail.com")?
            .add_header("1", "Sendmail")?;

        assert_eq!(draft.to_addresses().len(), 1);
        assert_eq!(draft.headers().get("1"), Some("Sendmail"));
        assert!(draft.is_ssl_on_connect());
        Ok(())
    }

    #[test]
    fn test_content_charset_adopted() {
        let mut draft = DraftMessage::new();
        draft.set_content("Olá", "text/plain; charset=ISO-8859-1").unwrap();
        assert_eq!(draft.charset().unwrap().label(), "ISO-8859-1");

        draft.set_charset("UTF-8").unwrap();
        draft.set_content("Olá", "text/plain; charset=ISO-8859-1").unwrap();
        assert_eq!(draft.charset().unwrap().label(), "UTF-8");
    }

    #[test]
    fn test_content_with_bad_charset_rejected_atomically() {
        let mut draft = DraftMessage::new();
        let err = draft.set_content("x", "text/plain; charset=bogus").unwrap_err();
        assert_eq!(err.kind(), MailErrorKind::InvalidCharset);
        assert!(draft.content().is_none());
        assert!(draft.charset().is_none());
    }

    #[test]
    fn test_invalid_charset() {
        let mut draft = DraftMessage::new();
        let err = draft.set_charset("klingon-8").unwrap_err();
        assert_eq!(err.kind(), MailErrorKind::InvalidCharset);
        assert!(draft.charset().is_none());
    }

    #[test]
    fn test_port_and_timeout_validation() {
        let mut draft = DraftMessage::new();
        assert!(draft.set_smtp_port(0).is_err());
        assert!(draft.set_ssl_smtp_port(0).is_err());
        assert!(draft.set_socket_connection_timeout(Duration::ZERO).is_err());
        assert_eq!(draft.smtp_port(), 25);
        assert_eq!(draft.ssl_smtp_port(), 465);

        draft.set_smtp_port(2525).unwrap();
        draft.set_socket_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(draft.smtp_port(), 2525);
        assert_eq!(draft.socket_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_with_session_config() {
        let config = SessionConfig::builder()
            .host("smtp.example.com")
            .connection_timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        let draft = DraftMessage::with_session_config(config);

        assert_eq!(draft.host_name().as_deref(), Some("smtp.example.com"));
        assert_eq!(draft.socket_connection_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_authentication_carried_into_session() {
        let mut draft = DraftMessage::new();
        draft.set_host_name("localhost").set_authentication("user", "pass");
        draft.set_bounce_address("bounce@example.com").unwrap();

        let session = draft.mail_session().unwrap();
        assert_eq!(session.credentials().unwrap().username(), "user");
        assert_eq!(session.bounce_address().unwrap().email(), "bounce@example.com");
    }
}
