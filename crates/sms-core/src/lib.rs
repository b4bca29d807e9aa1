//! # SMS Core
//!
//! Core traits and types shared by the voipms-sms bridge.
//!
//! This crate provides the fundamental building blocks:
//! - [`SmsClient`] / [`MmsClient`] traits for outbound messages
//! - [`InboundWebhook`] trait for turning a webhook body into a [`ParsedEvent`]
//! - [`identity`] for secret keys and unguessable webhook ids
//! - [`ObserverRegistry`] mapping phone numbers to the things updated by inbound messages
//! - [`Diagnostics`] and the [`Notifier`] seam for operator-visible errors
//!
//! ## Example
//!
//! ```rust,ignore
//! use sms_core::{SendRequest, SmsClient};
//!
//! let response = client.send(SendRequest {
//!     to: "5551234567",
//!     from: "5557654321",
//!     text: "Hello world!"
//! }).await?;
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub mod identity;
pub mod notify;
pub mod observer;
pub mod phone;

pub use identity::{
    generate_secret_key, generate_webhook_id, SecretKey, WebhookId, WebhookRegistration,
    WebhookStore, WEBHOOK_ID_PREFIX,
};
pub use notify::{Diagnostics, Notification, Notifier};
pub use observer::{MessageObserver, ObserverRegistry};

/// Errors that can occur during SMS operations
#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    /// HTTP communication error
    #[error("http error: {0}")]
    Http(String),
    /// Invalid request parameters
    #[error("invalid request: {0}")]
    Invalid(String),
    /// SMS provider returned an error
    #[error("provider error: {0}")]
    Provider(String),
    /// Local I/O failure, e.g. reading MMS media
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Unexpected error occurred
    #[error("unexpected: {0}")]
    Unexpected(String),
}

/// Step of inbound payload validation that rejected a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    /// Body is not JSON.
    Decode,
    /// Top level is not an object.
    Shape,
    /// `data.event_type` mismatch.
    EventType,
    /// `data.record_type` mismatch.
    RecordType,
    /// `data.payload.record_type` mismatch.
    PayloadRecordType,
    /// `data.payload.to` missing or empty.
    Destination,
}

impl ValidationStage {
    /// Whether a rejection at this stage is worth an operator notification.
    ///
    /// Shape and destination defects are client payload problems; everything
    /// else hints at a provider-side change worth looking at.
    pub fn notifies(self) -> bool {
        !matches!(self, ValidationStage::Shape | ValidationStage::Destination)
    }

    pub fn status(self) -> HttpStatus {
        HttpStatus::BadRequest
    }
}

/// Inbound payload rejected by the parse step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct ValidationError {
    pub stage: ValidationStage,
    pub detail: String,
}

impl ValidationError {
    pub fn new(stage: ValidationStage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            detail: detail.into(),
        }
    }
}

/// HTTP status code for web responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok = 200,
    BadRequest = 400,
    NotFound = 404,
    InternalServerError = 500,
}

impl HttpStatus {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Generic webhook response that can be converted to any framework's response type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: HttpStatus,
    pub body: String,
    pub content_type: String,
}

impl WebhookResponse {
    pub fn ok() -> Self {
        Self::text(HttpStatus::Ok, "OK")
    }

    pub fn error(status: HttpStatus, message: &str) -> Self {
        Self::text(status, message)
    }

    fn text(status: HttpStatus, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            content_type: "text/plain; charset=utf-8".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest<'a> {
    pub to: &'a str,
    /// Sending DID.
    pub from: &'a str,
    pub text: &'a str,
}

/// A text message with one attached media file.
#[derive(Debug, Clone)]
pub struct MmsRequest<'a> {
    pub to: &'a str,
    pub from: &'a str,
    pub text: &'a str,
    pub media: &'a Path,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendResponse {
    pub id: String,
    /// Name of the backend/provider that produced the response, e.g. "voipms".
    pub provider: &'static str,
    /// Raw provider payload for debugging / audit.
    pub raw: serde_json::Value,
}

/// Normalized inbound message as seen by an observer.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub id: Option<String>,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub text: Option<String>,
    /// Processing time; providers' own timestamps are not trusted.
    pub received_at: OffsetDateTime,
    pub raw: serde_json::Value,
}

/// Outcome of a successful parse step: where the message goes and what to hand over.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvent {
    /// Destination numbers exactly as reported by the provider.
    pub destinations: Vec<String>,
    /// The full decoded payload, delivered verbatim to observers.
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait SmsClient: Send + Sync {
    /// Send a single text SMS.
    async fn send(&self, req: SendRequest<'_>) -> Result<SendResponse, SmsError>;
}

#[async_trait]
pub trait MmsClient: Send + Sync {
    /// Send a single message with attached media.
    async fn send_mms(&self, req: MmsRequest<'_>) -> Result<SendResponse, SmsError>;
}

/// Utility to create a pseudo id if a provider doesn't return one.
pub fn fallback_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lightweight header representation to avoid tying the core to any HTTP framework.
pub type Headers = Vec<(String, String)>;

/// Provider-specific inbound webhook parsing.
pub trait InboundWebhook: Send + Sync {
    /// Stable provider key, e.g. "voipms".
    fn provider(&self) -> &'static str;
    /// Human readable provider name used in notifications, e.g. "VoIP.ms".
    fn display_name(&self) -> &'static str;
    /// Validate the raw body and extract its destinations.
    fn parse_event(&self, headers: &Headers, body: &[u8]) -> Result<ParsedEvent, ValidationError>;
}
