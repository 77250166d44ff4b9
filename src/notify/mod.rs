//! Outbound messages: composition and delivery backends.

pub mod compose;
pub mod outbox;
pub mod templates;
pub mod webhook;

use crate::LifecycleResult;

pub use compose::{ComposedMessage, Composer};
pub use outbox::OutboxNotifier;
pub use templates::MailKind;
pub use webhook::WebhookNotifier;

/// Delivers one composed message to one address.
pub trait Notifier {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> LifecycleResult<()>;
}

/// Writes messages to the log and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> LifecycleResult<()> {
        tracing::info!(
            recipient = recipient,
            subject = subject,
            body_len = body.len(),
            "Message delivered to log"
        );
        Ok(())
    }
}

/// Result of delivering one message to one or more recipients.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryTally {
    pub sent: usize,
    pub failed: usize,
}

/// Send `message` to every recipient. Failures are logged per recipient and
/// never stop delivery to the rest.
pub fn deliver<'r>(
    notifier: &dyn Notifier,
    recipients: impl IntoIterator<Item = &'r str>,
    message: &ComposedMessage,
) -> DeliveryTally {
    let mut tally = DeliveryTally::default();
    for recipient in recipients {
        let recipient = recipient.trim();
        if recipient.is_empty() {
            continue;
        }
        match notifier.send(recipient, &message.subject, &message.body) {
            Ok(()) => tally.sent += 1,
            Err(e) => {
                tracing::error!(
                    target: "inactive_user::audit",
                    recipient = recipient,
                    kind = message.kind.as_str(),
                    error = %e,
                    "Message delivery failed"
                );
                tally.failed += 1;
            }
        }
    }
    tally
}
