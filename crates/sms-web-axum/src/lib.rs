use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use bytes::Bytes;
use sms_core::{Headers, HttpStatus, Notifier, WebhookResponse, WebhookStore};
use sms_web_generic::{HeaderConverter, ResponseConverter, WebhookProcessor};
use tracing::{debug, info};

/// Path the inbound webhook is served on; `{webhook_id}` is the unguessable per-DID segment.
pub const WEBHOOK_ROUTE: &str = "/api/webhook/{webhook_id}";

#[derive(Clone)]
pub struct AppState {
    pub processor: WebhookProcessor,
    pub webhooks: WebhookStore,
    pub notifier: Arc<dyn Notifier>,
}

/// Axum-specific header converter
pub struct AxumHeaderConverter;

impl HeaderConverter for AxumHeaderConverter {
    type HeaderType = HeaderMap;

    fn to_generic_headers(headers: &Self::HeaderType) -> Headers {
        headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

/// Axum-specific response converter
pub struct AxumResponseConverter;

impl ResponseConverter for AxumResponseConverter {
    type ResponseType = Response;

    fn from_webhook_response(response: WebhookResponse) -> Self::ResponseType {
        let status = StatusCode::from_u16(response.status.as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(header::CONTENT_TYPE, response.content_type)],
            response.body,
        )
            .into_response()
    }
}

/// Handler: POST /api/webhook/{webhook_id}
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(did) = state.webhooks.did_for(&webhook_id) else {
        debug!("webhook call for unregistered id");
        return AxumResponseConverter::from_webhook_response(WebhookResponse::error(
            HttpStatus::NotFound,
            "Unknown webhook",
        ));
    };

    let generic_headers = AxumHeaderConverter::to_generic_headers(&headers);
    let outcome = state.processor.process_webhook(&generic_headers, &body);
    info!(
        did = %did,
        status = outcome.response.status.as_u16(),
        delivered = outcome.delivered.len(),
        "handled inbound webhook"
    );
    outcome.diagnostics.deliver(state.notifier.as_ref());
    AxumResponseConverter::from_webhook_response(outcome.response)
}

/// Router serving only the inbound webhook; merge it into a larger app as needed.
pub fn webhook_router(state: AppState) -> Router {
    Router::new()
        .route(WEBHOOK_ROUTE, post(receive_webhook))
        .with_state(state)
}
