//! Webhook identities.
//!
//! Each DID gets a random secret, and the public webhook id is derived from
//! `(phone_number, secret)`. The id only has to be unguessable; the host's
//! webhook dispatch is the trust boundary, so the hash is truncated to keep
//! URLs short.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const WEBHOOK_ID_PREFIX: &str = "voipms_sms_";

const SECRET_BYTES: usize = 16;
const HASH_HEX_LEN: usize = 16;

/// Hex-encoded random secret salting a DID's webhook id.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

/// Path component of a DID's inbound endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WebhookId(String);

impl WebhookId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WebhookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mint a fresh 128-bit secret from the OS random source.
pub fn generate_secret_key() -> SecretKey {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    SecretKey(hex::encode(bytes))
}

/// Derive `<prefix><phone>_<first 16 hex of sha256("<phone>:<secret>")>`.
pub fn generate_webhook_id(phone_number: &str, secret_key: &SecretKey) -> WebhookId {
    let digest = Sha256::digest(format!("{}:{}", phone_number, secret_key.as_str()).as_bytes());
    let hash = hex::encode(digest);
    WebhookId(format!(
        "{}{}_{}",
        WEBHOOK_ID_PREFIX,
        phone_number,
        &hash[..HASH_HEX_LEN]
    ))
}

/// Secret and derived id of a set-up DID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRegistration {
    pub secret_key: SecretKey,
    pub webhook_id: WebhookId,
}

/// In-memory DID -> webhook identity map, shared between the lifecycle and the HTTP layer.
#[derive(Debug, Default, Clone)]
pub struct WebhookStore {
    map: Arc<RwLock<BTreeMap<String, WebhookRegistration>>>,
}

impl WebhookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DID, reusing its secret if it is already known.
    pub fn register(&self, did: &str) -> WebhookId {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(did.to_string())
            .or_insert_with(|| {
                let secret_key = generate_secret_key();
                let webhook_id = generate_webhook_id(did, &secret_key);
                WebhookRegistration {
                    secret_key,
                    webhook_id,
                }
            })
            .webhook_id
            .clone()
    }

    /// Forget a DID and its secret; the published endpoint stops resolving.
    pub fn remove(&self, did: &str) -> Option<WebhookRegistration> {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(did)
    }

    pub fn webhook_id(&self, did: &str) -> Option<WebhookId> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(did)
            .map(|r| r.webhook_id.clone())
    }

    /// Reverse lookup: which DID published this webhook id.
    pub fn did_for(&self, webhook_id: &str) -> Option<String> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(_, r)| r.webhook_id.as_str() == webhook_id)
            .map(|(did, _)| did.clone())
    }

    pub fn contains_webhook(&self, webhook_id: &str) -> bool {
        self.did_for(webhook_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
