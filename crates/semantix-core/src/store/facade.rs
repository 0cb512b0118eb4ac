//! Typed get/set/remove facade over the bridge.
//!
//! This layer is where transport failures stop mattering: every method
//! catches the bridge error, logs it, and returns a documented sentinel
//! (schema default, `false`, empty map). Callers cannot tell a timeout
//! from "key never set", and are never expected to handle errors.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::bridge::{BridgeClient, ChangeCallback, RequestOp, SubscriptionId};

use super::keys::StorageKey;

#[derive(Clone)]
pub struct SemantixStorage {
    bridge: Arc<BridgeClient>,
}

impl SemantixStorage {
    pub fn new(bridge: Arc<BridgeClient>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Arc<BridgeClient> {
        &self.bridge
    }

    /// Fetch a key, substituting its schema default when the host has no
    /// value or the bridge failed. Never returns `Value::Null`.
    pub async fn get(&self, key: StorageKey) -> Value {
        self.get_or(key, key.schema_default()).await
    }

    /// Like [`get`](Self::get) but with a caller-supplied fallback used
    /// when the key has no schema default behavior of its own.
    pub async fn get_or(&self, key: StorageKey, default: Value) -> Value {
        match self
            .bridge
            .request(RequestOp::Get {
                key: key.as_str().to_string(),
            })
            .await
        {
            Ok(Some(value)) if !value.is_null() => value,
            Ok(_) => default,
            Err(e) => {
                warn!(key = %key, error = %e, "storage get failed, returning default");
                default
            }
        }
    }

    pub async fn set(&self, key: StorageKey, value: Value) -> bool {
        match self
            .bridge
            .request(RequestOp::Set {
                key: key.as_str().to_string(),
                value,
            })
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "storage set failed");
                false
            }
        }
    }

    pub async fn remove(&self, key: StorageKey) -> bool {
        match self
            .bridge
            .request(RequestOp::Remove {
                key: key.as_str().to_string(),
            })
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "storage remove failed");
                false
            }
        }
    }

    /// Batched get. Partial failure is not modeled: on any bridge error
    /// the whole batch degrades to an empty map.
    pub async fn get_multiple(&self, keys: &[StorageKey]) -> HashMap<StorageKey, Value> {
        let wire_keys = keys.iter().map(|k| k.as_str().to_string()).collect();
        match self
            .bridge
            .request(RequestOp::GetMultiple { keys: wire_keys })
            .await
        {
            Ok(Some(Value::Object(map))) => map
                .into_iter()
                .filter_map(|(k, v)| StorageKey::from_wire(&k).map(|key| (key, v)))
                .collect(),
            Ok(_) => HashMap::new(),
            Err(e) => {
                warn!(error = %e, "storage get_multiple failed");
                HashMap::new()
            }
        }
    }

    pub async fn set_multiple(&self, items: Vec<(StorageKey, Value)>) -> bool {
        let items = items
            .into_iter()
            .map(|(k, v)| (k.as_str().to_string(), v))
            .collect();
        match self.bridge.request(RequestOp::SetMultiple { items }).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "storage set_multiple failed");
                false
            }
        }
    }

    /// Listener invoked on every cache-updating event for `key`: own
    /// sets/removes and remote UPDATE broadcasts alike.
    pub fn on_change(&self, key: StorageKey, callback: ChangeCallback) -> SubscriptionId {
        self.bridge.on_change(key, callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bridge.unsubscribe(id)
    }

    /// Last-known cached value; never authoritative.
    pub fn cached(&self, key: StorageKey) -> Option<Value> {
        self.bridge.cached(key)
    }
}
