//! Message Assembly Example
//!
//! This example demonstrates how to:
//! - Configure a draft with recipients, headers and a body
//! - Let the session be synthesized from host and TLS settings
//! - Deliver the assembled message through a sink

use integrations_mail::mocks::RecordingSink;
use integrations_mail::{DraftMessage, MailError};

#[tokio::main]
async fn main() -> Result<(), MailError> {
    let mut draft = DraftMessage::new();
    draft
        .set_host_name("smtp.example.com")
        .set_start_tls_enabled(true)
        .set_authentication("user@example.com", "your-password")
        .set_subject("Hello from Rust!");

    draft
        .set_from_named("sender@example.com", "Sender Name")?
        .add_to("recipient@example.com")?
        .add_bcc("audit@example.com")?
        .add_header("X-Priority", "3")?
        .set_content("This is a test email.\nSent from Rust.", "text/plain; charset=UTF-8")?;

    let session = draft.mail_session()?;
    println!("Session: {:?}", session.address());

    let sink = RecordingSink::new();
    let message_id = draft.send(&sink).await?;
    println!("Delivered {}", message_id);

    for message in sink.delivered() {
        println!("{}", String::from_utf8_lossy(&message.to_bytes()));
    }

    Ok(())
}
