//! Privileged-side peer of the storage bridge.
//!
//! The host owns the authoritative key-value data and serves one client
//! over the wire types in [`super::wire`]. Every successful SET/REMOVE
//! additionally emits an UPDATE broadcast so page-side caches converge
//! without polling.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::constants::SOURCE_PAGE;

use super::wire::{HostMessage, Request, RequestOp};

/// Authoritative storage behind the host. Implementations are plain
/// synchronous maps; the host task serializes all access.
pub trait StorageBackend: Send {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);
    /// Returns `true` if the key existed.
    fn remove(&mut self, key: &str) -> bool;
}

/// In-memory backend for tests and throwaway contexts.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, Value>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a key, bypassing the wire. Test setup helper.
    pub fn seed(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}

/// Single-JSON-file backend for the CLI. The whole map is rewritten on
/// every mutation using write-to-temp-then-rename, so an interrupted
/// write never corrupts the store.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl FileBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!(path = %path.display(), "store file unreadable, starting empty");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e),
        };
        Ok(Self { path, entries })
    }

    fn persist(&self) {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let tmp = self.path.with_extension("tmp");
            let raw = serde_json::to_string_pretty(&Value::Object(self.entries.clone()))
                .unwrap_or_else(|_| "{}".to_string());
            fs::write(&tmp, raw)?;
            fs::rename(&tmp, &self.path)
        };
        if let Err(e) = write() {
            warn!(path = %self.path.display(), error = %e, "failed to persist store");
        }
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
        self.persist();
    }

    fn remove(&mut self, key: &str) -> bool {
        let existed = self.entries.remove(key).is_some();
        if existed {
            self.persist();
        }
        existed
    }
}

/// Host task: serves requests until the request channel closes.
pub struct StorageHost;

impl StorageHost {
    pub fn spawn(
        mut backend: Box<dyn StorageBackend>,
        mut requests: mpsc::UnboundedReceiver<Request>,
        outbound: mpsc::UnboundedSender<HostMessage>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(request) = requests.recv().await {
                if request.source != SOURCE_PAGE {
                    debug!(source = request.source, "dropping request with foreign source tag");
                    continue;
                }
                let request_id = request.request_id;
                let mut updates = Vec::new();

                let response = match request.op {
                    RequestOp::Get { key } => {
                        HostMessage::ok(request_id, Some(backend.get(&key).unwrap_or(Value::Null)))
                    }
                    RequestOp::Set { key, value } => {
                        backend.set(&key, value.clone());
                        updates.push(HostMessage::update(key, value));
                        HostMessage::ok(request_id, None)
                    }
                    RequestOp::Remove { key } => {
                        backend.remove(&key);
                        updates.push(HostMessage::update(key, Value::Null));
                        HostMessage::ok(request_id, None)
                    }
                    RequestOp::GetMultiple { keys } => {
                        let mut result = Map::new();
                        for key in keys {
                            let value = backend.get(&key).unwrap_or(Value::Null);
                            result.insert(key, value);
                        }
                        HostMessage::ok(request_id, Some(Value::Object(result)))
                    }
                    RequestOp::SetMultiple { items } => {
                        for (key, value) in items {
                            backend.set(&key, value.clone());
                            updates.push(HostMessage::update(key, value));
                        }
                        HostMessage::ok(request_id, None)
                    }
                };

                if outbound.send(response).is_err() {
                    break;
                }
                for update in updates {
                    if outbound.send(update).is_err() {
                        return;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_backend_round_trip() {
        let mut backend = MemoryBackend::new();
        assert_eq!(backend.get("k"), None);
        backend.set("k", json!({"a": 1}));
        assert_eq!(backend.get("k"), Some(json!({"a": 1})));
        assert!(backend.remove("k"));
        assert!(!backend.remove("k"));
    }

    #[test]
    fn test_file_backend_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.set("semantix_favorites", json!([{"conversationId": "c1"}]));
        }

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(
            reopened.get("semantix_favorites"),
            Some(json!([{"conversationId": "c1"}]))
        );
    }

    #[test]
    fn test_file_backend_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json at all").unwrap();

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.get("anything"), None);
    }

    #[tokio::test]
    async fn test_host_answers_and_broadcasts() {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        StorageHost::spawn(Box::new(MemoryBackend::new()), req_rx, out_tx);

        req_tx
            .send(Request::new(
                "r1".to_string(),
                RequestOp::Set {
                    key: "semantix_projects".to_string(),
                    value: json!([]),
                },
            ))
            .unwrap();

        let response = out_rx.recv().await.unwrap();
        assert!(matches!(
            response,
            HostMessage::Response { success: true, .. }
        ));
        let update = out_rx.recv().await.unwrap();
        match update {
            HostMessage::Update { key, data, .. } => {
                assert_eq!(key, "semantix_projects");
                assert_eq!(data, json!([]));
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_host_ignores_foreign_source() {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        StorageHost::spawn(Box::new(MemoryBackend::new()), req_rx, out_tx);

        let mut request = Request::new(
            "r1".to_string(),
            RequestOp::Get {
                key: "semantix_favorites".to_string(),
            },
        );
        request.source = "third-frame".to_string();
        req_tx.send(request).unwrap();

        // Follow with a legitimate request; it must be the first answer.
        req_tx
            .send(Request::new(
                "r2".to_string(),
                RequestOp::Get {
                    key: "semantix_favorites".to_string(),
                },
            ))
            .unwrap();

        match out_rx.recv().await.unwrap() {
            HostMessage::Response { request_id, .. } => assert_eq!(request_id, "r2"),
            other => panic!("expected response, got {:?}", other),
        }
    }
}
