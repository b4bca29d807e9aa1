//! HTTP surface: the inbound webhook plus service and state endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sms_core::Notifier;
use sms_web_axum::{webhook_router, AppState};

use crate::bridge::{Bridge, BridgeError};
use crate::notifications::ERROR_NOTIFICATION_ID;

#[derive(Debug, Deserialize)]
pub struct SendSmsBody {
    pub recipient: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMmsBody {
    pub recipient: String,
    pub message: String,
    pub image_path: PathBuf,
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = match self {
            BridgeError::Sms(_) => StatusCode::BAD_GATEWAY,
            BridgeError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::AlreadyObserved(_) => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn send_sms(
    State(bridge): State<Arc<Bridge>>,
    Json(body): Json<SendSmsBody>,
) -> Result<Response, BridgeError> {
    let sent = bridge.send_sms(&body.recipient, &body.message).await?;
    Ok(Json(sent).into_response())
}

async fn send_mms(
    State(bridge): State<Arc<Bridge>>,
    Json(body): Json<SendMmsBody>,
) -> Result<Response, BridgeError> {
    let sent = bridge
        .send_mms(&body.recipient, &body.message, &body.image_path)
        .await?;
    Ok(Json(sent).into_response())
}

async fn get_webhook_url(State(bridge): State<Arc<Bridge>>) -> Response {
    let notification = bridge.show_webhook_url();
    let status = if notification.notification_id == ERROR_NOTIFICATION_ID {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(notification)).into_response()
}

async fn sensor_state(State(bridge): State<Arc<Bridge>>, Path(did): Path<String>) -> Response {
    match bridge.sensor_state(&did) {
        Some(state) => Json(state).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "unknown DID" }))).into_response(),
    }
}

async fn notifications(State(bridge): State<Arc<Bridge>>) -> Response {
    Json(bridge.notifications().list()).into_response()
}

/// Full application router bound to a bridge.
pub fn router(bridge: Arc<Bridge>) -> Router {
    let notifier: Arc<dyn Notifier> = Arc::new(bridge.notifications().clone());
    let webhook_state = AppState {
        processor: bridge.processor(),
        webhooks: bridge.webhooks().clone(),
        notifier,
    };

    Router::new()
        .route("/api/services/send_sms", post(send_sms))
        .route("/api/services/send_mms", post(send_mms))
        .route("/api/services/get_webhook_url", post(get_webhook_url))
        .route("/api/states/{did}", get(sensor_state))
        .route("/api/notifications", get(notifications))
        .with_state(bridge)
        .merge(webhook_router(webhook_state))
}
