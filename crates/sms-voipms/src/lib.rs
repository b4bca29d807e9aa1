//! # VoIP.ms backend
//!
//! REST client for sending SMS/MMS through VoIP.ms, and the parse step for
//! its inbound "message.received" webhooks.

use async_trait::async_trait;
use serde::Serialize;
use sms_core::{MmsClient, MmsRequest, SendRequest, SendResponse, SmsClient, SmsError};
use tracing::{debug, error, info};

pub mod inbound;
pub mod media;

pub use inbound::{inbound_message, VoipMsWebhook};
pub use media::{encode_media, validate_image_path};

pub(crate) const PROVIDER: &str = "voipms";

/// Default VoIP.ms REST endpoint.
pub const DEFAULT_API_URL: &str = "https://voip.ms/api/v1/rest.php";

/// VoIP.ms REST client.
#[derive(Clone)]
pub struct VoipMsClient {
    /// Account e-mail used as `api_username`.
    pub api_username: String,
    api_password: String,
    /// REST endpoint; override for testing/mocking.
    pub api_url: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for VoipMsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoipMsClient")
            .field("api_username", &self.api_username)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl VoipMsClient {
    pub fn new<S: Into<String>>(api_username: S, api_password: S) -> Self {
        Self::with_api_url(api_username, api_password, DEFAULT_API_URL.to_string())
    }

    pub fn with_api_url<S: Into<String>>(api_username: S, api_password: S, api_url: String) -> Self {
        Self {
            api_username: api_username.into(),
            api_password: api_password.into(),
            api_url,
            http: reqwest::Client::new(),
        }
    }

    /// Shared handling of a VoIP.ms reply; `id_field` is `sms` or `mms`.
    async fn read_response(
        &self,
        res: reqwest::Response,
        id_field: &str,
    ) -> Result<SendResponse, SmsError> {
        if !res.status().is_success() {
            // The body may echo request parameters, so only the status is reported.
            let status = res.status();
            error!(%status, "VoIP.ms rejected the request");
            return Err(SmsError::Provider(format!("HTTP {}", status)));
        }

        let raw_text = res
            .text()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;
        let raw_json: serde_json::Value = serde_json::from_str(&raw_text)
            .unwrap_or_else(|_| serde_json::json!({ "raw": raw_text }));

        if let Some(status) = raw_json.get("status").and_then(|v| v.as_str()) {
            if status != "success" {
                error!(status, "VoIP.ms reported a failure");
                return Err(SmsError::Provider(status.to_string()));
            }
        }

        let id = match raw_json.get(id_field) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => sms_core::fallback_id(),
        };

        Ok(SendResponse {
            id,
            provider: PROVIDER,
            raw: raw_json,
        })
    }
}

#[derive(Debug, Serialize)]
struct VoipMsSendSms<'a> {
    api_username: &'a str,
    api_password: &'a str,
    did: &'a str,
    dst: &'a str,
    method: &'static str,
    message: &'a str,
}

#[async_trait]
impl SmsClient for VoipMsClient {
    async fn send(&self, req: SendRequest<'_>) -> Result<SendResponse, SmsError> {
        let params = VoipMsSendSms {
            api_username: &self.api_username,
            api_password: &self.api_password,
            did: req.from,
            dst: req.to,
            method: "sendSMS",
            message: req.text,
        };
        debug!(did = req.from, dst = req.to, "sending SMS");
        let res = self
            .http
            .get(&self.api_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;

        let response = self.read_response(res, "sms").await?;
        info!(id = %response.id, "SMS sent successfully");
        Ok(response)
    }
}

#[async_trait]
impl MmsClient for VoipMsClient {
    async fn send_mms(&self, req: MmsRequest<'_>) -> Result<SendResponse, SmsError> {
        let media = encode_media(req.media).await?;
        let form = reqwest::multipart::Form::new()
            .text("api_username", self.api_username.clone())
            .text("api_password", self.api_password.clone())
            .text("did", req.from.to_string())
            .text("dst", req.to.to_string())
            .text("message", req.text.to_string())
            .text("method", "sendMMS")
            .text("media1", media);

        debug!(did = req.from, dst = req.to, "sending MMS");
        let res = self
            .http
            .post(&self.api_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;

        let response = self.read_response(res, "mms").await?;
        info!(id = %response.id, "MMS sent successfully");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Multipart, Query, State};
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn spawn_api(reply: serde_json::Value) -> (String, Captured) {
        let captured: Captured = Arc::default();

        async fn on_get(
            State((captured, reply)): State<(Captured, serde_json::Value)>,
            Query(params): Query<HashMap<String, String>>,
        ) -> Json<serde_json::Value> {
            captured.lock().unwrap().push(params);
            Json(reply)
        }

        async fn on_post(
            State((captured, reply)): State<(Captured, serde_json::Value)>,
            mut multipart: Multipart,
        ) -> Json<serde_json::Value> {
            let mut fields = HashMap::new();
            while let Some(field) = multipart.next_field().await.unwrap() {
                let name = field.name().unwrap().to_string();
                fields.insert(name, field.text().await.unwrap());
            }
            captured.lock().unwrap().push(fields);
            Json(reply)
        }

        let app = Router::new()
            .route("/rest.php", get(on_get).post(on_post))
            .with_state((captured.clone(), reply));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{}/rest.php", addr), captured)
    }

    #[tokio::test]
    async fn send_sms_uses_query_parameters() {
        let (url, captured) =
            spawn_api(serde_json::json!({ "status": "success", "sms": 23434 })).await;
        let client = VoipMsClient::with_api_url("user@example.com", "hunter2", url);

        let res = client
            .send(SendRequest {
                to: "5557654321",
                from: "5551234567",
                text: "hello there",
            })
            .await
            .unwrap();
        assert_eq!(res.id, "23434");
        assert_eq!(res.provider, "voipms");

        let calls = captured.lock().unwrap();
        let params = &calls[0];
        assert_eq!(params["method"], "sendSMS");
        assert_eq!(params["api_username"], "user@example.com");
        assert_eq!(params["api_password"], "hunter2");
        assert_eq!(params["did"], "5551234567");
        assert_eq!(params["dst"], "5557654321");
        assert_eq!(params["message"], "hello there");
    }

    #[tokio::test]
    async fn provider_failure_status_is_an_error() {
        let (url, _) = spawn_api(serde_json::json!({ "status": "invalid_credentials" })).await;
        let client = VoipMsClient::with_api_url("user", "bad", url);

        let err = client
            .send(SendRequest {
                to: "5557654321",
                from: "5551234567",
                text: "hi",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SmsError::Provider(ref s) if s == "invalid_credentials"));
    }

    #[tokio::test]
    async fn send_mms_posts_multipart_with_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("cat.png");
        std::fs::write(&image, b"\x89PNG fake").unwrap();

        let (url, captured) =
            spawn_api(serde_json::json!({ "status": "success", "mms": "777" })).await;
        let client = VoipMsClient::with_api_url("user", "pw", url);

        let res = client
            .send_mms(MmsRequest {
                to: "5557654321",
                from: "5551234567",
                text: "look",
                media: &image,
            })
            .await
            .unwrap();
        assert_eq!(res.id, "777");

        let calls = captured.lock().unwrap();
        let fields = &calls[0];
        assert_eq!(fields["method"], "sendMMS");
        assert_eq!(fields["dst"], "5557654321");
        assert_eq!(fields["message"], "look");
        assert!(fields["media1"].starts_with("data:image/png;base64,"));
    }

    #[test]
    fn debug_hides_password() {
        let client = VoipMsClient::new("user", "hunter2");
        assert!(!format!("{:?}", client).contains("hunter2"));
    }
}
