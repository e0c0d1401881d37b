//! Digest email rendering and delivery.
//!
//! Delivery is attempted once. Retrying a failed dispatch is the batch
//! driver's job, so [`Mailer::deliver`] surfaces every failure.

mod error;
mod render;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use digestd_core::DigestSummary;

pub use error::MailError;
pub use render::{render_email, render_html, render_text, subject, RenderedEmail};
pub use transport::{EmailTransport, OutgoingEmail, ResendTransport};

pub struct Mailer {
    transport: Arc<dyn EmailTransport>,
    from: String,
    deadline: Duration,
}

impl Mailer {
    #[must_use]
    pub fn new(transport: Arc<dyn EmailTransport>, from: impl Into<String>, deadline: Duration) -> Self {
        Self {
            transport,
            from: from.into(),
            deadline,
        }
    }

    /// Render `summary` and send it to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] if the transport fails or exceeds the deadline.
    pub async fn deliver(
        &self,
        recipient: &str,
        digest_name: &str,
        summary: &DigestSummary,
        sent_on: NaiveDate,
    ) -> Result<String, MailError> {
        let rendered = render_email(digest_name, summary, sent_on);
        let email = OutgoingEmail {
            from: self.from.clone(),
            to: vec![recipient.to_string()],
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
        };

        let id = tokio::time::timeout(self.deadline, self.transport.send(&email))
            .await
            .map_err(|_| MailError::Timeout(self.deadline))??;

        tracing::info!(
            message_id = %id,
            items = summary.item_count(),
            "digest email dispatched"
        );
        Ok(id)
    }
}
