//! Delivery boundary for assembled messages.
//!
//! The crate stops at a wire-ready [`AssembledMessage`]. Anything that puts it
//! on the network implements [`MessageSink`].

use async_trait::async_trait;
use std::fmt;

use crate::assembler::AssembledMessage;
use crate::errors::MailResult;

/// Receives assembled messages for delivery.
#[async_trait]
pub trait MessageSink: Send + Sync + fmt::Debug {
    /// Delivers the message and returns the message ID the sink recorded.
    ///
    /// Failures are reported as `DeliveryFailed`.
    async fn deliver(&self, message: &AssembledMessage) -> MailResult<String>;
}
