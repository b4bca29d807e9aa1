//! In-memory operator notifications.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use sms_core::{Notification, Notifier};
use tracing::info;

pub const ERROR_NOTIFICATION_ID: &str = "voipms_sms_error";
pub const WEBHOOK_URL_NOTIFICATION_ID: &str = "voipms_sms_webhook_url";

/// Notifications keyed by id; a newer notification replaces an older one with the same id.
#[derive(Debug, Default, Clone)]
pub struct PersistentNotifications {
    inner: Arc<RwLock<BTreeMap<String, Notification>>>,
}

impl PersistentNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<Notification> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn get(&self, notification_id: &str) -> Option<Notification> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(notification_id)
            .cloned()
    }

    pub fn dismiss(&self, notification_id: &str) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(notification_id)
            .is_some()
    }
}

impl Notifier for PersistentNotifications {
    fn notify(&self, notification: &Notification) {
        info!(
            notification_id = %notification.notification_id,
            title = %notification.title,
            "{}",
            notification.message
        );
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(notification.notification_id.clone(), notification.clone());
    }
}
