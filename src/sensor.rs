//! Incoming-SMS sensor: the observable state of one DID.

use serde::Serialize;
use sms_core::{MessageObserver, SmsError, WebhookId};
use time::format_description::well_known::Rfc3339;
use tokio::sync::watch;
use tracing::info;

pub const SENSOR_ICON: &str = "mdi:message-text-outline";
const INITIAL_STATE: &str = "No messages";

/// Snapshot published to subscribers after every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorState {
    pub state: String,
    pub from: Option<String>,
    pub message: Option<String>,
    pub message_id: Option<String>,
    /// RFC 3339 processing time of the last message.
    pub last_updated: Option<String>,
    pub phone_number: String,
    pub webhook_url: String,
}

pub struct IncomingSmsSensor {
    phone_number: String,
    webhook_id: WebhookId,
    state: watch::Sender<SensorState>,
}

impl IncomingSmsSensor {
    pub fn new(phone_number: &str, webhook_id: WebhookId, webhook_url: String) -> Self {
        let initial = SensorState {
            state: INITIAL_STATE.to_string(),
            from: None,
            message: None,
            message_id: None,
            last_updated: None,
            phone_number: phone_number.to_string(),
            webhook_url,
        };
        Self {
            phone_number: phone_number.to_string(),
            webhook_id,
            state: watch::Sender::new(initial),
        }
    }

    pub fn name(&self) -> String {
        format!("VoIP.ms SMS {}", self.phone_number)
    }

    pub fn unique_id(&self) -> String {
        format!("voipms_sms_incoming_{}", self.phone_number)
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn webhook_id(&self) -> &WebhookId {
        &self.webhook_id
    }

    pub fn state(&self) -> SensorState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published state change.
    pub fn subscribe(&self) -> watch::Receiver<SensorState> {
        self.state.subscribe()
    }
}

impl MessageObserver for IncomingSmsSensor {
    fn update(&self, payload: &serde_json::Value) -> Result<(), SmsError> {
        let message = sms_voipms::inbound_message(payload);
        let last_updated = message
            .received_at
            .format(&Rfc3339)
            .map_err(|e| SmsError::Unexpected(e.to_string()))?;

        self.state.send_modify(|state| {
            state.state = match &message.from {
                Some(from) => format!("Message from {}", from),
                None => "New message".to_string(),
            };
            state.from = message.from.clone();
            state.message = message.text.clone();
            state.message_id = message.id.clone();
            state.last_updated = Some(last_updated);
        });

        info!(
            phone_number = %self.phone_number,
            from = ?message.from,
            "received SMS"
        );
        Ok(())
    }
}
