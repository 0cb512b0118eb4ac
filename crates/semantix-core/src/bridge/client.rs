//! Page-side bridge client: request/response correlation over a
//! one-way-broadcast channel.
//!
//! Every outbound request registers a pending entry keyed by a fresh
//! request id; a single dispatcher task completes entries as responses
//! arrive. Resolution and timeout are first-wins: whichever side removes
//! the pending entry decides, and a late response for an already
//! timed-out id is dropped silently.
//!
//! The client also owns the page-side cache (last-known value per key,
//! never authoritative) and the per-key change-listener registry fed by
//! both local writes and UPDATE broadcasts from the host.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::constants::SOURCE_RESPONSE;
use crate::error::{BridgeError, Result};
use crate::store::StorageKey;

use super::wire::{HostMessage, Request, RequestOp};

/// A unique identifier for a change subscription.
pub type SubscriptionId = u64;

/// Callback invoked with the new value of a key (`Value::Null` after a
/// remove). Must not block for extended periods.
pub type ChangeCallback = Arc<dyn Fn(&Value) + Send + Sync>;

type PendingMap = Mutex<HashMap<String, oneshot::Sender<Result<Option<Value>>>>>;

/// Shared state between the client handle and its dispatcher task.
struct BridgeShared {
    pending: PendingMap,
    cache: RwLock<HashMap<StorageKey, Value>>,
    listeners: RwLock<HashMap<StorageKey, HashMap<SubscriptionId, ChangeCallback>>>,
    next_subscription: AtomicU64,
}

impl BridgeShared {
    fn store(&self, key: StorageKey, value: Value) {
        self.cache.write().insert(key, value);
    }

    fn evict(&self, key: StorageKey) {
        self.cache.write().remove(&key);
    }

    /// Cache write-through plus listener fan-out. A panicking listener is
    /// isolated so the others still run.
    fn store_and_notify(&self, key: StorageKey, value: Value) {
        self.store(key, value.clone());
        self.notify(key, &value);
    }

    fn notify(&self, key: StorageKey, value: &Value) {
        let listeners = self.listeners.read();
        if let Some(for_key) = listeners.get(&key) {
            for (id, callback) in for_key {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    callback(value);
                }));
                if result.is_err() {
                    warn!(key = %key, subscription = id, "change listener panicked");
                }
            }
        }
    }
}

/// Client end of the storage bridge.
pub struct BridgeClient {
    outbound: mpsc::UnboundedSender<Request>,
    shared: Arc<BridgeShared>,
    timeout: Duration,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeClient {
    /// Wire a client to an already-established transport pair and spawn
    /// its inbound dispatcher. Must be called within a tokio runtime.
    pub fn new(
        outbound: mpsc::UnboundedSender<Request>,
        inbound: mpsc::UnboundedReceiver<HostMessage>,
        timeout: Duration,
    ) -> Self {
        let shared = Arc::new(BridgeShared {
            pending: Mutex::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
            listeners: RwLock::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        });

        let dispatcher = tokio::spawn(dispatch_inbound(inbound, shared.clone()));

        Self {
            outbound,
            shared,
            timeout,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Send one request and await its correlated response.
    ///
    /// On success the local cache is updated according to the operation:
    /// GET stores the returned value, SET stores the written value,
    /// REMOVE evicts. SET and REMOVE additionally fan out to change
    /// listeners; GET does not (reads are not change events).
    pub async fn request(&self, op: RequestOp) -> Result<Option<Value>> {
        let request_id = generate_request_id();
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(request_id.clone(), tx);

        let request = Request::new(request_id.clone(), op.clone());
        if self.outbound.send(request).is_err() {
            self.shared.pending.lock().remove(&request_id);
            return Err(BridgeError::TransportClosed);
        }

        let outcome = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            // Dispatcher task gone without resolving us
            Ok(Err(_)) => {
                self.shared.pending.lock().remove(&request_id);
                Err(BridgeError::TransportClosed)
            }
            Err(_) => {
                // First-wins: removing the entry here means a late
                // response finds nothing and is dropped.
                self.shared.pending.lock().remove(&request_id);
                Err(BridgeError::Timeout(request_id))
            }
        };

        if outcome.is_ok() {
            self.apply_cache_effects(&op, outcome.as_ref().ok().and_then(|d| d.as_ref()));
        }
        outcome
    }

    fn apply_cache_effects(&self, op: &RequestOp, data: Option<&Value>) {
        match op {
            RequestOp::Get { key } => {
                if let (Some(key), Some(value)) = (StorageKey::from_wire(key), data) {
                    if !value.is_null() {
                        self.shared.store(key, value.clone());
                    }
                }
            }
            RequestOp::Set { key, value } => {
                if let Some(key) = StorageKey::from_wire(key) {
                    self.shared.store_and_notify(key, value.clone());
                }
            }
            RequestOp::Remove { key } => {
                if let Some(key) = StorageKey::from_wire(key) {
                    self.shared.evict(key);
                    self.shared.notify(key, &Value::Null);
                }
            }
            RequestOp::GetMultiple { .. } => {
                if let Some(Value::Object(map)) = data {
                    for (wire_key, value) in map {
                        if let Some(key) = StorageKey::from_wire(wire_key) {
                            if !value.is_null() {
                                self.shared.store(key, value.clone());
                            }
                        }
                    }
                }
            }
            RequestOp::SetMultiple { items } => {
                for (wire_key, value) in items {
                    if let Some(key) = StorageKey::from_wire(wire_key) {
                        self.shared.store_and_notify(key, value.clone());
                    }
                }
            }
        }
    }

    /// Last-known cached value for a key. Never authoritative — always
    /// superseded by a fresh GET.
    pub fn cached(&self, key: StorageKey) -> Option<Value> {
        self.shared.cache.read().get(&key).cloned()
    }

    /// Register a listener for cache-updating events on `key` (local
    /// writes and UPDATE broadcasts alike). Multiple listeners per key
    /// are allowed.
    pub fn on_change(&self, key: StorageKey, callback: ChangeCallback) -> SubscriptionId {
        let id = self.shared.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.shared
            .listeners
            .write()
            .entry(key)
            .or_default()
            .insert(id, callback);
        id
    }

    /// Remove exactly one registration. Returns `true` if it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.shared.listeners.write();
        for for_key in listeners.values_mut() {
            if for_key.remove(&id).is_some() {
                return true;
            }
        }
        false
    }

    /// Number of requests currently awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        if let Some(handle) = self.dispatcher.lock().take() {
            handle.abort();
        }
    }
}

/// Inbound dispatcher: correlates RESPONSE messages to pending requests
/// and applies UPDATE broadcasts to the cache + listeners.
async fn dispatch_inbound(
    mut inbound: mpsc::UnboundedReceiver<HostMessage>,
    shared: Arc<BridgeShared>,
) {
    while let Some(message) = inbound.recv().await {
        // Reference-equality check on event.source in the original;
        // here the channel itself is the trust boundary and we only
        // verify the source tag.
        if message.source() != SOURCE_RESPONSE {
            debug!(source = message.source(), "dropping message with foreign source tag");
            continue;
        }

        match message {
            HostMessage::Response {
                request_id,
                success,
                data,
                error,
                ..
            } => {
                let Some(sender) = shared.pending.lock().remove(&request_id) else {
                    // Timed out already, or never ours
                    debug!(request_id, "dropping unmatched response");
                    continue;
                };
                let result = if success {
                    Ok(data)
                } else {
                    Err(BridgeError::Rejected(
                        error.unwrap_or_else(|| "unknown error".to_string()),
                    ))
                };
                // Receiver may have raced the timeout; nothing to do then
                let _ = sender.send(result);
            }
            HostMessage::Update { key, data, .. } => match StorageKey::from_wire(&key) {
                // A null broadcast means the key was removed: evict
                // rather than caching the null.
                Some(key) if data.is_null() => {
                    shared.evict(key);
                    shared.notify(key, &Value::Null);
                }
                Some(key) => shared.store_and_notify(key, data),
                None => debug!(key, "update broadcast for unknown key"),
            },
        }
    }
}

/// Timestamp plus random suffix — collisions are not designed for, only
/// accidentally avoided, which is fine at one id per in-flight call.
fn generate_request_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", crate::models::now_ms(), &suffix[..8])
}
