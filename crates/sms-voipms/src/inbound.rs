//! Parse step for VoIP.ms inbound webhooks.
//!
//! Expected body:
//!
//! ```json
//! {"data": {"event_type": "message.received", "record_type": "event",
//!   "payload": {"record_type": "message", "to": [{"phone_number": "+15551234567"}],
//!               "from": {"phone_number": "+15557654321"}, "text": "hi", "id": 123}}}
//! ```

use serde_json::Value;
use sms_core::{
    Headers, InboundMessage, InboundWebhook, ParsedEvent, ValidationError, ValidationStage,
};
use time::OffsetDateTime;
use tracing::{debug, error, warn};

use crate::PROVIDER;

const EVENT_TYPE: &str = "message.received";
const RECORD_TYPE: &str = "event";
const PAYLOAD_RECORD_TYPE: &str = "message";

/// Inbound webhook parser for VoIP.ms.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoipMsWebhook;

fn describe(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn expect_field(
    value: Option<&Value>,
    expected: &str,
    stage: ValidationStage,
    label: &str,
) -> Result<(), ValidationError> {
    if value.and_then(Value::as_str) == Some(expected) {
        return Ok(());
    }
    let detail = format!("Unknown {} received: {}", label, describe(value));
    warn!("{}", detail);
    Err(ValidationError::new(stage, detail))
}

impl InboundWebhook for VoipMsWebhook {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn display_name(&self) -> &'static str {
        "VoIP.ms"
    }

    fn parse_event(&self, _headers: &Headers, body: &[u8]) -> Result<ParsedEvent, ValidationError> {
        let payload: Value = serde_json::from_slice(body).map_err(|e| {
            let detail = format!("Invalid JSON payload: {}", e);
            error!("{}", detail);
            ValidationError::new(ValidationStage::Decode, detail)
        })?;
        debug!(%payload, "received webhook data");

        if !payload.is_object() {
            error!("invalid webhook payload - not an object");
            return Err(ValidationError::new(
                ValidationStage::Shape,
                "Invalid payload",
            ));
        }

        let data = payload.get("data");
        let inner = data.and_then(|d| d.get("payload"));

        expect_field(
            data.and_then(|d| d.get("event_type")),
            EVENT_TYPE,
            ValidationStage::EventType,
            "event_type",
        )?;
        expect_field(
            data.and_then(|d| d.get("record_type")),
            RECORD_TYPE,
            ValidationStage::RecordType,
            "record_type",
        )?;
        expect_field(
            inner.and_then(|p| p.get("record_type")),
            PAYLOAD_RECORD_TYPE,
            ValidationStage::PayloadRecordType,
            "payload record_type",
        )?;

        let destinations: Vec<String> = inner
            .and_then(|p| p.get("to"))
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| {
                        entry
                            .get("phone_number")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default();

        if destinations.is_empty() {
            let detail = "No destination phone number in payload";
            error!("{}", detail);
            return Err(ValidationError::new(ValidationStage::Destination, detail));
        }

        Ok(ParsedEvent {
            destinations,
            payload,
        })
    }
}

/// Pull the message fields out of a raw webhook payload, stamped with the current time.
pub fn inbound_message(raw: &Value) -> InboundMessage {
    let inner = raw.get("data").and_then(|d| d.get("payload"));
    let field = |name: &str| inner.and_then(|p| p.get(name));

    let id = match field("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };
    let to = field("to")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get("phone_number").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    InboundMessage {
        id,
        from: field("from")
            .and_then(|f| f.get("phone_number"))
            .and_then(Value::as_str)
            .map(str::to_string),
        to,
        text: field("text").and_then(Value::as_str).map(str::to_string),
        received_at: OffsetDateTime::now_utc(),
        raw: raw.clone(),
    }
}
