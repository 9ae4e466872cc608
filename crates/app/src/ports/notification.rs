//! Notification port — outbound broadcast to connected clients.

use std::sync::Arc;

/// Broadcasts JSON payloads to whoever listens.
pub trait NotificationChannel: Send + Sync {
    /// Send `payload` to every current listener. Delivery is best effort.
    fn broadcast(&self, payload: serde_json::Value);
}

impl<T: NotificationChannel + ?Sized> NotificationChannel for Arc<T> {
    fn broadcast(&self, payload: serde_json::Value) {
        (**self).broadcast(payload);
    }
}
