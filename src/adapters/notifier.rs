use crate::domain::model::Notification;
use crate::domain::ports::Notifier;

/// Delivers notifications to the log instead of a phone or mailbox.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        let recipient = &notification.recipient;
        tracing::info!(
            parcel = %notification.parcel_id,
            phone = %recipient.phone,
            email = recipient.email.as_deref().unwrap_or("-"),
            "Notify {}: {}",
            recipient.name,
            notification.message
        );
    }
}
