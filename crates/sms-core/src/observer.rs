use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::SmsError;

/// Something that wants to hear about inbound messages for one phone number.
pub trait MessageObserver: Send + Sync {
    /// Receive the full raw webhook payload. Must not block.
    fn update(&self, payload: &serde_json::Value) -> Result<(), SmsError>;
}

/// Runtime registry of phone number -> observer.
///
/// Written by setup/teardown, read by the webhook router. Iteration is in
/// phone number order so "first match wins" is stable.
#[derive(Default, Clone)]
pub struct ObserverRegistry {
    map: Arc<RwLock<BTreeMap<String, Arc<dyn MessageObserver>>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration, handy when wiring tests and examples.
    /// The first observer for a number wins; later ones are dropped with a warning.
    pub fn with(self, phone_number: &str, observer: Arc<dyn MessageObserver>) -> Self {
        if !self.register(phone_number, observer) {
            warn!(phone_number, "duplicate observer ignored");
        }
        self
    }

    /// Returns `false` (and keeps the existing observer) if the number is already registered.
    pub fn register(&self, phone_number: &str, observer: Arc<dyn MessageObserver>) -> bool {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(phone_number) {
            debug!(phone_number, "observer already registered");
            return false;
        }
        map.insert(phone_number.to_string(), observer);
        true
    }

    pub fn remove(&self, phone_number: &str) -> Option<Arc<dyn MessageObserver>> {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(phone_number)
    }

    pub fn get(&self, phone_number: &str) -> Option<Arc<dyn MessageObserver>> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(phone_number)
            .cloned()
    }

    /// Copy of every registration, so callers never hold the lock while observers run.
    pub fn lookup_all(&self) -> Vec<(String, Arc<dyn MessageObserver>)> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
