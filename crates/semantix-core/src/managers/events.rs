//! Change notification for entity managers.
//!
//! Two fan-out paths, mirroring the original's local listener map plus
//! page-wide CustomEvent: action-scoped callbacks registered directly on
//! a manager, and a broadcast channel any other component can subscribe
//! to without holding the manager itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

use crate::models::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeAction {
    Added,
    Removed,
    Updated,
    Moved,
    Imported,
    FolderSelected,
}

/// `{action, item}` payload delivered to consumers. `item` is the raw
/// JSON representation so widgets outside the manager's object graph
/// don't need the concrete entity type.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub section: Section,
    pub action: ChangeAction,
    pub item: Option<Value>,
}

pub type ActionCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

const BROADCAST_CAPACITY: usize = 64;

pub struct ChangeNotifier {
    section: Section,
    /// Listener maps are isolated per action type: a subscriber to
    /// `Added` never sees (or blocks) `Removed` traffic.
    listeners: RwLock<HashMap<ChangeAction, HashMap<u64, ActionCallback>>>,
    next_subscription: AtomicU64,
    broadcast: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new(section: Section) -> Self {
        let (broadcast, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            section,
            listeners: RwLock::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
            broadcast,
        }
    }

    pub fn on(&self, action: ChangeAction, callback: ActionCallback) -> u64 {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .write()
            .entry(action)
            .or_default()
            .insert(id, callback);
        id
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut listeners = self.listeners.write();
        for for_action in listeners.values_mut() {
            if for_action.remove(&id).is_some() {
                return true;
            }
        }
        false
    }

    /// Page-wide event stream, the analog of the DOM CustomEvent surface.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.broadcast.subscribe()
    }

    pub fn emit(&self, action: ChangeAction, item: Option<Value>) {
        let event = ChangeEvent {
            section: self.section,
            action,
            item,
        };

        {
            let listeners = self.listeners.read();
            if let Some(for_action) = listeners.get(&action) {
                for (id, callback) in for_action {
                    // One bad listener must not prevent the others
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        callback(&event);
                    }));
                    if result.is_err() {
                        warn!(section = %self.section, subscription = id, "change listener panicked");
                    }
                }
            }
        }

        // No receivers is fine; the send error is meaningless then
        let _ = self.broadcast.send(event);
    }
}
