//! Typed notification bus.
//!
//! The presentation layer subscribes; services publish. This replaces
//! ambient global dispatch with an explicit handle that is passed to the
//! components that need it.

use tokio::sync::broadcast;

/// Severity of a notification, mapped to display styling by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Success => "success",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        }
    }
}

/// A single user-facing notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Broadcast channel for notifications.
///
/// Cloning is cheap; all clones publish into the same channel. Publishing
/// with no subscribers is not an error - the notification is dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Notification>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a notification to all current subscribers.
    pub fn publish(&self, level: NotificationLevel, message: impl Into<String>) {
        let notification = Notification {
            level,
            message: message.into(),
        };
        tracing::debug!(
            level = notification.level.label(),
            "notify: {}",
            notification.message
        );
        // A send error only means nobody is listening right now.
        let _ = self.tx.send(notification);
    }

    /// Subscribe to notifications published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(32)
    }
}
