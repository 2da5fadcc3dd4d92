//! Notification seam.
//!
//! The tracker composes [`Notification`]s and hands them to a [`Notifier`].
//! Delivery is best effort: the tracker logs a failed send and moves on.

pub mod templates;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

/// A composed message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Recipient address.
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("no recipient address")]
    MissingRecipient,

    #[error("delivery to {to} failed: {reason}")]
    Delivery { to: String, reason: String },
}

/// Delivers notifications. Implementations must not assume they are called
/// before or after any particular storage operation.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if notification.to.trim().is_empty() {
            return Err(NotifyError::MissingRecipient);
        }
        info!(
            to = %notification.to,
            subject = %notification.subject,
            bytes = notification.html_body.len(),
            "notification"
        );
        Ok(())
    }
}

/// Send every notification in order, logging failures. Returns how many
/// were delivered.
pub(crate) async fn dispatch(notifier: &dyn Notifier, batch: &[Notification]) -> usize {
    let mut delivered = 0;
    for notification in batch {
        match notifier.send(notification).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!(to = %notification.to, error = %e, "notification failed"),
        }
    }
    delivered
}
