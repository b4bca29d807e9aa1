use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use sms_core::phone;
use sms_core::{
    Diagnostics, Headers, HttpStatus, InboundWebhook, Notification, ObserverRegistry,
    ParsedEvent, ValidationError, WebhookResponse,
};
use tracing::{debug, error, warn};

/// What handling one webhook produced: the HTTP answer plus anything the operator should see.
#[derive(Debug, Clone)]
pub struct WebhookOutcome {
    pub response: WebhookResponse,
    pub diagnostics: Diagnostics,
    /// Registered phone numbers whose observer received the payload.
    pub delivered: Vec<String>,
}

/// Framework-agnostic webhook processor: parse, match against observers, dispatch.
#[derive(Clone)]
pub struct WebhookProcessor {
    hook: Arc<dyn InboundWebhook>,
    observers: ObserverRegistry,
}

impl WebhookProcessor {
    pub fn new(hook: Arc<dyn InboundWebhook>, observers: ObserverRegistry) -> Self {
        Self { hook, observers }
    }

    /// Process an incoming webhook request. Never panics and never fails; every
    /// problem is folded into the returned response and diagnostics.
    pub fn process_webhook(&self, headers: &Headers, body: &[u8]) -> WebhookOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| {
            self.process_webhook_internal(headers, body)
        })) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = format!("Error processing webhook: {}", panic_message(&*payload));
                error!("{}", message);
                WebhookOutcome {
                    response: WebhookResponse::error(HttpStatus::InternalServerError, &message),
                    diagnostics: Diagnostics::single(self.error_notification(&message)),
                    delivered: Vec::new(),
                }
            }
        }
    }

    fn process_webhook_internal(&self, headers: &Headers, body: &[u8]) -> WebhookOutcome {
        match self.hook.parse_event(headers, body) {
            Ok(event) => {
                let delivered = self.route(&event);
                WebhookOutcome {
                    response: WebhookResponse::ok(),
                    diagnostics: Diagnostics::new(),
                    delivered,
                }
            }
            Err(e) => self.rejection(e),
        }
    }

    /// Deliver the payload to the first matching observer of each destination.
    fn route(&self, event: &ParsedEvent) -> Vec<String> {
        let observers = self.observers.lookup_all();
        let mut delivered = Vec::new();

        for destination in &event.destinations {
            let matched = observers
                .iter()
                .find(|(stored, _)| phone::numbers_match(destination, stored));
            if let Some((stored, observer)) = matched {
                debug!(destination = %destination, observer = %stored, "routing inbound message");
                if let Err(e) = observer.update(&event.payload) {
                    error!(observer = %stored, "observer failed to apply update: {}", e);
                }
                delivered.push(stored.clone());
            }
        }

        if delivered.is_empty() {
            warn!(
                destinations = ?event.destinations,
                "no observer found for destination phone numbers"
            );
        }
        delivered
    }

    fn rejection(&self, error: ValidationError) -> WebhookOutcome {
        let diagnostics = if error.stage.notifies() {
            Diagnostics::single(self.error_notification(&error.detail))
        } else {
            Diagnostics::new()
        };
        WebhookOutcome {
            response: WebhookResponse::error(error.stage.status(), &error.detail),
            diagnostics,
            delivered: Vec::new(),
        }
    }

    fn error_notification(&self, message: &str) -> Notification {
        Notification::new(
            format!("{}_sms_error", self.hook.provider()),
            format!("{} SMS Error", self.hook.display_name()),
            message,
        )
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Helper trait for framework adapters to convert headers
pub trait HeaderConverter {
    type HeaderType;

    fn to_generic_headers(headers: &Self::HeaderType) -> Headers;
}

/// Helper trait for framework adapters to convert responses
pub trait ResponseConverter {
    type ResponseType;

    fn from_webhook_response(response: WebhookResponse) -> Self::ResponseType;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use sms_core::{MessageObserver, SmsError};
    use sms_voipms::VoipMsWebhook;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<Value>>);

    impl MessageObserver for Recording {
        fn update(&self, payload: &Value) -> Result<(), SmsError> {
            self.0.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    struct Exploding;

    impl MessageObserver for Exploding {
        fn update(&self, _payload: &Value) -> Result<(), SmsError> {
            panic!("sensor went away");
        }
    }

    struct Failing;

    impl MessageObserver for Failing {
        fn update(&self, _payload: &Value) -> Result<(), SmsError> {
            Err(SmsError::Unexpected("broken".into()))
        }
    }

    fn body(event_type: &str, to: Value) -> Vec<u8> {
        json!({
            "data": {
                "event_type": event_type,
                "record_type": "event",
                "payload": {
                    "record_type": "message",
                    "to": to,
                    "from": { "phone_number": "+15557654321" },
                    "text": "hi",
                    "id": "abc"
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    fn processor(observers: ObserverRegistry) -> WebhookProcessor {
        WebhookProcessor::new(Arc::new(VoipMsWebhook), observers)
    }

    #[test]
    fn matching_observer_receives_full_payload() {
        let sensor = Arc::new(Recording::default());
        let p = processor(ObserverRegistry::new().with("5551234567", sensor.clone()));

        let raw = body("message.received", json!([{ "phone_number": "+15551234567" }]));
        let outcome = p.process_webhook(&vec![], &raw);

        assert_eq!(outcome.response.status.as_u16(), 200);
        assert_eq!(outcome.response.body, "OK");
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.delivered, ["5551234567"]);
        let seen = sensor.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], serde_json::from_slice::<Value>(&raw).unwrap());
    }

    #[test]
    fn unmatched_destination_still_answers_ok() {
        let sensor = Arc::new(Recording::default());
        let p = processor(ObserverRegistry::new().with("5551234567", sensor.clone()));

        let outcome = p.process_webhook(
            &vec![],
            &body("message.received", json!([{ "phone_number": "+16045551234" }])),
        );

        assert_eq!(outcome.response.status.as_u16(), 200);
        assert_eq!(outcome.response.body, "OK");
        assert!(outcome.delivered.is_empty());
        assert!(sensor.0.lock().unwrap().is_empty());
    }

    #[test]
    fn every_destination_is_routed() {
        let a = Arc::new(Recording::default());
        let b = Arc::new(Recording::default());
        let p = processor(
            ObserverRegistry::new()
                .with("5551234567", a.clone())
                .with("6045551234", b.clone()),
        );

        let outcome = p.process_webhook(
            &vec![],
            &body(
                "message.received",
                json!([{ "phone_number": "+15551234567" }, { "phone_number": "6045551234" }]),
            ),
        );

        assert_eq!(outcome.delivered, ["5551234567", "6045551234"]);
        assert_eq!(a.0.lock().unwrap().len(), 1);
        assert_eq!(b.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn first_matching_observer_wins() {
        let local = Arc::new(Recording::default());
        let with_country_code = Arc::new(Recording::default());
        let p = processor(
            ObserverRegistry::new()
                .with("5551234567", local.clone())
                .with("15551234567", with_country_code.clone()),
        );

        let outcome = p.process_webhook(
            &vec![],
            &body("message.received", json!([{ "phone_number": "+15551234567" }])),
        );

        assert_eq!(outcome.response.status.as_u16(), 200);
        assert_eq!(outcome.delivered, ["15551234567"]);
        assert_eq!(with_country_code.0.lock().unwrap().len(), 1);
        assert!(local.0.lock().unwrap().is_empty());
    }

    #[test]
    fn wrong_event_type_notifies_once() {
        let p = processor(ObserverRegistry::new());
        let outcome = p.process_webhook(
            &vec![],
            &body("message.sent", json!([{ "phone_number": "+15551234567" }])),
        );

        assert_eq!(outcome.response.status.as_u16(), 400);
        assert!(outcome.response.body.contains("message.sent"));
        assert_eq!(outcome.diagnostics.len(), 1);
        let n = &outcome.diagnostics.notifications()[0];
        assert_eq!(n.notification_id, "voipms_sms_error");
        assert_eq!(n.title, "VoIP.ms SMS Error");
    }

    #[test]
    fn non_json_body_is_rejected_without_panicking() {
        let p = processor(ObserverRegistry::new());
        let outcome = p.process_webhook(&vec![], b"<xml/>");
        assert_eq!(outcome.response.status.as_u16(), 400);
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn empty_destinations_do_not_notify() {
        let p = processor(ObserverRegistry::new());
        let outcome = p.process_webhook(&vec![], &body("message.received", json!([])));
        assert_eq!(outcome.response.status.as_u16(), 400);
        assert_eq!(
            outcome.response.body,
            "No destination phone number in payload"
        );
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn shape_error_does_not_notify() {
        let p = processor(ObserverRegistry::new());
        let outcome = p.process_webhook(&vec![], b"\"just a string\"");
        assert_eq!(outcome.response.status.as_u16(), 400);
        assert_eq!(outcome.response.body, "Invalid payload");
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn observer_panic_becomes_500() {
        let p = processor(ObserverRegistry::new().with("5551234567", Arc::new(Exploding)));
        let outcome = p.process_webhook(
            &vec![],
            &body("message.received", json!([{ "phone_number": "+15551234567" }])),
        );

        assert_eq!(outcome.response.status.as_u16(), 500);
        assert_eq!(
            outcome.response.body,
            "Error processing webhook: sensor went away"
        );
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn observer_error_is_logged_not_returned() {
        let p = processor(ObserverRegistry::new().with("5551234567", Arc::new(Failing)));
        let outcome = p.process_webhook(
            &vec![],
            &body("message.received", json!([{ "phone_number": "5551234567" }])),
        );
        assert_eq!(outcome.response.status.as_u16(), 200);
        assert_eq!(outcome.delivered, ["5551234567"]);
    }
}
