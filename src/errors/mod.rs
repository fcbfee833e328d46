//! Error types for message assembly.
//!
//! Every failure carries a [`MailErrorKind`] so callers can branch on the
//! cause without matching message text, plus a severity classification and a
//! recoverability flag for the build-once state machine.

use std::fmt;
use thiserror::Error;

/// Result type for mail operations.
pub type MailResult<T> = Result<T, MailError>;

/// Mail error kinds categorizing different failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailErrorKind {
    // Address errors
    /// Address string is syntactically invalid.
    InvalidAddress,
    /// Batch or replacement recipient input was empty.
    EmptyRecipientList,

    // Header and content errors
    /// Header name or value is invalid.
    InvalidHeader,
    /// Charset name is unknown.
    InvalidCharset,
    /// Content type could not be parsed.
    InvalidContentType,

    // Assembly errors
    /// No sender was set.
    MissingSender,
    /// No To, Cc or Bcc recipient was set.
    MissingRecipient,
    /// A session had to be synthesized but no host was configured.
    MissingHost,
    /// The draft was already assembled.
    AlreadyAssembled,

    // Configuration errors
    /// Configuration is invalid.
    ConfigurationInvalid,

    // Delivery boundary
    /// The message sink rejected the message.
    DeliveryFailed,
}

impl MailErrorKind {
    /// Returns the severity level of this error kind.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MailErrorKind::AlreadyAssembled | MailErrorKind::ConfigurationInvalid => {
                ErrorSeverity::Critical
            }

            MailErrorKind::MissingSender
            | MailErrorKind::MissingRecipient
            | MailErrorKind::MissingHost
            | MailErrorKind::DeliveryFailed => ErrorSeverity::Error,

            MailErrorKind::InvalidAddress
            | MailErrorKind::EmptyRecipientList
            | MailErrorKind::InvalidHeader
            | MailErrorKind::InvalidCharset
            | MailErrorKind::InvalidContentType => ErrorSeverity::Warning,
        }
    }

    /// Returns true if the draft stays usable after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, MailErrorKind::AlreadyAssembled)
    }
}

impl fmt::Display for MailErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailErrorKind::InvalidAddress => write!(f, "Invalid address"),
            MailErrorKind::EmptyRecipientList => write!(f, "Empty recipient list"),
            MailErrorKind::InvalidHeader => write!(f, "Invalid header"),
            MailErrorKind::InvalidCharset => write!(f, "Invalid charset"),
            MailErrorKind::InvalidContentType => write!(f, "Invalid content type"),
            MailErrorKind::MissingSender => write!(f, "Missing sender"),
            MailErrorKind::MissingRecipient => write!(f, "Missing recipient"),
            MailErrorKind::MissingHost => write!(f, "Missing host"),
            MailErrorKind::AlreadyAssembled => write!(f, "Message already assembled"),
            MailErrorKind::ConfigurationInvalid => write!(f, "Invalid configuration"),
            MailErrorKind::DeliveryFailed => write!(f, "Delivery failed"),
        }
    }
}

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Bad input, caller can correct it and retry.
    Warning,
    /// Operation failed.
    Error,
    /// Programmer misuse or broken configuration.
    Critical,
}

/// Mail error with detailed information.
#[derive(Error, Debug)]
pub struct MailError {
    kind: MailErrorKind,
    message: String,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl MailError {
    /// Creates a new mail error.
    pub fn new(kind: MailErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Sets the underlying cause.
    pub fn with_cause<E: std::error::Error + Send + Sync + 'static>(mut self, cause: E) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> MailErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        self.kind.severity()
    }

    /// Returns true if the draft stays usable after this error.
    pub fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }

    // Convenience constructors

    /// Creates an invalid address error.
    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::new(MailErrorKind::InvalidAddress, message)
    }

    /// Creates an empty recipient list error.
    pub fn empty_recipients(message: impl Into<String>) -> Self {
        Self::new(MailErrorKind::EmptyRecipientList, message)
    }

    /// Creates an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::new(MailErrorKind::InvalidHeader, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(MailErrorKind::ConfigurationInvalid, message)
    }

    /// Creates a delivery error.
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::new(MailErrorKind::DeliveryFailed, message)
    }

    /// Creates the error for a second build of the same draft.
    pub fn already_assembled() -> Self {
        Self::new(
            MailErrorKind::AlreadyAssembled,
            "The message has already been assembled; start a new draft",
        )
    }
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_assembled_is_not_recoverable() {
        let err = MailError::already_assembled();
        assert_eq!(err.kind(), MailErrorKind::AlreadyAssembled);
        assert!(!err.is_recoverable());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_validation_errors_are_recoverable() {
        assert!(MailErrorKind::InvalidAddress.is_recoverable());
        assert!(MailErrorKind::MissingSender.is_recoverable());
        assert!(MailErrorKind::MissingHost.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = MailError::invalid_address("abc has no @");
        assert_eq!(err.to_string(), "Invalid address: abc has no @");
    }

    #[test]
    fn test_error_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = MailError::configuration("cannot read config").with_cause(io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
