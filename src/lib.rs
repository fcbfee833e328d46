//! # Mail Assembly Library
//!
//! Builds a single validated, immutable e-mail message from incrementally
//! supplied parts:
//! - RFC 5322 address validation with optional display names
//! - To, Cc, Bcc and Reply-To lists with atomic batch adds
//! - Ordered, case-insensitive custom headers
//! - Charset-aware subject and body encoding
//! - Transport session resolution from an explicit session or from host,
//!   port, timeout and TLS settings
//! - Build-once assembly with a fixed validation order
//!
//! Network delivery is out of scope; implement [`MessageSink`] to hand the
//! assembled message to a transport.
//!
//! ## Quick Start
//!
//! ```rust
//! use integrations_mail::{DraftMessage, MailResult};
//!
//! fn main() -> MailResult<()> {
//!     let mut draft = DraftMessage::new();
//!     draft
//!         .set_host_name("smtp.example.com")
//!         .set_subject("Hello from Rust!");
//!     draft
//!         .set_from("sender@example.com")?
//!         .add_to_named("recipient@example.com", "Recipient")?
//!         .add_header("X-Mailer", "integrations-mail")?;
//!
//!     let message = draft.build_message()?;
//!     println!("{}", String::from_utf8_lossy(&message.to_bytes()));
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Message parts
pub mod headers;
pub mod mime;
pub mod recipients;

// Session resolution
pub mod session;

// Assembly
pub mod assembler;
pub mod draft;

// Delivery boundary
pub mod transport;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use assembler::{AssembledMessage, AssemblyState, MessageAssembler, MessageParts};
pub use config::{SessionConfig, SessionConfigBuilder};
pub use draft::DraftMessage;
pub use errors::{ErrorSeverity, MailError, MailErrorKind, MailResult};
pub use headers::{Header, HeaderStore};
pub use crate::mime::{Charset, Content, MimeWriter};
pub use recipients::RecipientRegistry;
pub use session::{Credentials, Session, SessionBuilder, SessionResolver};
pub use transport::MessageSink;
pub use types::{Address, RecipientRole};
