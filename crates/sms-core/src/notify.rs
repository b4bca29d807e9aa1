use serde::{Deserialize, Serialize};

/// Operator-visible message. A later notification with the same id replaces an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: String,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(
        notification_id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notification_id: notification_id.into(),
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Best-effort, fire-and-forget notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Notifications raised while handling one request, delivered separately from the response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    notifications: Vec<Notification>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(notification: Notification) -> Self {
        Self {
            notifications: vec![notification],
        }
    }

    pub fn push(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn deliver(&self, notifier: &dyn Notifier) {
        for notification in &self.notifications {
            notifier.notify(notification);
        }
    }
}
