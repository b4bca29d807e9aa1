//! DID lifecycle and outbound services.
//!
//! The [`Bridge`] owns every piece of per-DID state: webhook identities,
//! the observer registry the router reads, and the sensors behind it.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use sms_core::phone::{is_valid_did, is_valid_phone_number};
use sms_core::{
    MmsClient, MmsRequest, Notification, Notifier, ObserverRegistry, SendRequest, SendResponse,
    SmsClient, SmsError, WebhookId, WebhookStore,
};
use sms_voipms::{validate_image_path, VoipMsClient, VoipMsWebhook};
use sms_web_generic::WebhookProcessor;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::notifications::{
    PersistentNotifications, ERROR_NOTIFICATION_ID, WEBHOOK_URL_NOTIFICATION_ID,
};
use crate::sensor::{IncomingSmsSensor, SensorState};

const NOTIFICATION_TITLE: &str = "VoIP.ms SMS";

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("DID must be a numeric phone number (at least 10 digits): {0}")]
    InvalidDid(String),
    #[error("invalid recipient phone number format")]
    InvalidRecipient,
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("invalid image path: path traversal detected or path not absolute")]
    InvalidImagePath,
    #[error("image file not found")]
    ImageNotFound,
    #[error("no DID is set up")]
    NotConfigured,
    #[error("another observer is already registered for DID: {0}")]
    AlreadyObserved(String),
    #[error(transparent)]
    Sms(#[from] SmsError),
}

pub struct Bridge {
    client: VoipMsClient,
    base_url: String,
    webhooks: WebhookStore,
    observers: ObserverRegistry,
    sensors: RwLock<BTreeMap<String, Arc<IncomingSmsSensor>>>,
    notifications: PersistentNotifications,
    default_did: RwLock<Option<String>>,
}

impl Bridge {
    pub fn new(client: VoipMsClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            webhooks: WebhookStore::new(),
            observers: ObserverRegistry::new(),
            sensors: RwLock::default(),
            notifications: PersistentNotifications::new(),
            default_did: RwLock::default(),
        }
    }

    /// Build a bridge from configuration and set up every configured DID.
    pub fn from_config(config: &AppConfig) -> Result<Self, BridgeError> {
        let client = VoipMsClient::with_api_url(
            config.account.api_username.clone(),
            config.account.api_password.clone(),
            config.account.api_url.clone(),
        );
        let bridge = Self::new(client, config.server.base_url());
        for did in &config.account.dids {
            bridge.setup_did(did)?;
        }
        Ok(bridge)
    }

    /// Register the DID's webhook and its sensor. Setting up an existing DID is a no-op
    /// that returns the already published webhook id.
    pub fn setup_did(&self, did: &str) -> Result<WebhookId, BridgeError> {
        let did = did.trim();
        if !is_valid_did(did) {
            error!(did, "refusing to set up malformed DID");
            return Err(BridgeError::InvalidDid(did.to_string()));
        }

        let had_webhook = self.webhooks.webhook_id(did).is_some();
        let webhook_id = self.webhooks.register(did);
        info!(did, webhook_id = %webhook_id, "registered webhook");

        let mut sensors = self.sensors.write().unwrap_or_else(PoisonError::into_inner);
        if sensors.contains_key(did) {
            debug!(did, "sensor already exists, skipping creation");
        } else {
            let sensor = Arc::new(IncomingSmsSensor::new(
                did,
                webhook_id.clone(),
                self.url_for(&webhook_id),
            ));
            if !self.observers.register(did, sensor.clone()) {
                drop(sensors);
                if !had_webhook {
                    self.webhooks.remove(did);
                }
                error!(did, "DID already has an observer, sensor not created");
                return Err(BridgeError::AlreadyObserved(did.to_string()));
            }
            sensors.insert(did.to_string(), sensor);
        }
        drop(sensors);

        self.default_did
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(|| did.to_string());
        Ok(webhook_id)
    }

    /// Drop everything known about a DID. Returns `false` if it was not set up.
    pub fn teardown_did(&self, did: &str) -> bool {
        let did = did.trim();
        let registration = self.webhooks.remove(did);
        self.observers.remove(did);
        let sensor = self
            .sensors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(did);

        let mut default_did = self.default_did.write().unwrap_or_else(PoisonError::into_inner);
        if default_did.as_deref() == Some(did) {
            *default_did = self
                .sensors
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .keys()
                .next()
                .cloned();
        }

        let existed = registration.is_some() || sensor.is_some();
        if existed {
            info!(did, "unregistered webhook");
        } else {
            warn!(did, "teardown requested for unknown DID");
        }
        existed
    }

    pub fn default_did(&self) -> Option<String> {
        self.default_did
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn webhooks(&self) -> &WebhookStore {
        &self.webhooks
    }

    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    pub fn notifications(&self) -> &PersistentNotifications {
        &self.notifications
    }

    /// Router for inbound VoIP.ms webhooks bound to this bridge's observers.
    pub fn processor(&self) -> WebhookProcessor {
        WebhookProcessor::new(Arc::new(VoipMsWebhook), self.observers.clone())
    }

    pub fn sensor(&self, did: &str) -> Option<Arc<IncomingSmsSensor>> {
        self.sensors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(did)
            .cloned()
    }

    pub fn sensor_state(&self, did: &str) -> Option<SensorState> {
        self.sensor(did).map(|s| s.state())
    }

    fn url_for(&self, webhook_id: &WebhookId) -> String {
        format!("{}/api/webhook/{}", self.base_url, webhook_id)
    }

    pub fn webhook_url(&self, did: &str) -> Option<String> {
        self.webhooks.webhook_id(did).map(|id| self.url_for(&id))
    }

    fn sender(&self) -> Result<String, BridgeError> {
        self.default_did().ok_or_else(|| {
            error!("no configuration found, set up a DID first");
            BridgeError::NotConfigured
        })
    }

    fn check_message(recipient: &str, message: &str) -> Result<(), BridgeError> {
        if message.is_empty() {
            error!("recipient or message missing");
            return Err(BridgeError::EmptyMessage);
        }
        if !is_valid_phone_number(recipient) {
            error!("invalid recipient phone number format");
            return Err(BridgeError::InvalidRecipient);
        }
        Ok(())
    }

    /// Send an SMS from the default DID.
    pub async fn send_sms(
        &self,
        recipient: &str,
        message: &str,
    ) -> Result<SendResponse, BridgeError> {
        Self::check_message(recipient, message)?;
        let did = self.sender()?;
        let response = self
            .client
            .send(SendRequest {
                to: recipient,
                from: &did,
                text: message,
            })
            .await
            .inspect_err(|e| error!("failed to send SMS: {}", e))?;
        Ok(response)
    }

    /// Send an MMS with one image from the default DID.
    pub async fn send_mms(
        &self,
        recipient: &str,
        message: &str,
        image_path: &Path,
    ) -> Result<SendResponse, BridgeError> {
        Self::check_message(recipient, message)?;
        if !validate_image_path(image_path) {
            error!("invalid image path - path traversal detected or path not absolute");
            return Err(BridgeError::InvalidImagePath);
        }
        if !tokio::fs::try_exists(image_path).await.unwrap_or(false) {
            error!("image file not found");
            return Err(BridgeError::ImageNotFound);
        }
        let did = self.sender()?;
        let response = self
            .client
            .send_mms(MmsRequest {
                to: recipient,
                from: &did,
                text: message,
                media: image_path,
            })
            .await
            .inspect_err(|e| error!("failed to send MMS: {}", e))?;
        Ok(response)
    }

    /// Publish the default DID's webhook URL as a notification, or an error
    /// notification when nothing is set up.
    pub fn show_webhook_url(&self) -> Notification {
        let notification = match self.default_did() {
            None => Notification::new(
                ERROR_NOTIFICATION_ID,
                NOTIFICATION_TITLE,
                "No configuration found. Please set up the integration.",
            ),
            Some(did) => match self.webhook_url(&did) {
                None => Notification::new(
                    ERROR_NOTIFICATION_ID,
                    NOTIFICATION_TITLE,
                    format!("No webhook found for DID: {}", did),
                ),
                Some(url) => Notification::new(
                    WEBHOOK_URL_NOTIFICATION_ID,
                    format!("{} - Webhook URL", NOTIFICATION_TITLE),
                    format!(
                        "**Webhook URL for DID {}:**\n\n`{}`\n\nCopy this URL and configure it in your VoIP.ms portal under SMS settings.",
                        did, url
                    ),
                ),
            },
        };
        self.notifications.notify(&notification);
        notification
    }
}
