//! In-process notification channel backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use crate::ports::NotificationChannel;

/// [`NotificationChannel`] fanning payloads out over a tokio [`broadcast`]
/// channel.
///
/// Broadcasting succeeds even when there are no active subscribers
/// (the payload is simply dropped).
pub struct BroadcastNotifier {
    sender: broadcast::Sender<serde_json::Value>,
}

impl BroadcastNotifier {
    /// Create a notifier with the given channel capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to notifications.
    ///
    /// Returns a receiver that will get all payloads broadcast *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<serde_json::Value> {
        self.sender.subscribe()
    }
}

impl NotificationChannel for BroadcastNotifier {
    fn broadcast(&self, payload: serde_json::Value) {
        if self.sender.send(payload).is_err() {
            tracing::trace!("notification dropped, no subscribers");
        }
    }
}
