//! Generic list manipulation over array-valued keys.
//!
//! All operations are read-modify-write over the facade with no
//! atomicity guarantee: two interleaved writers can both read the same
//! stale list and the later write wins. That matches the upstream store
//! contract (last write wins); see the concurrency notes in DESIGN.md.

use serde_json::Value;
use tracing::warn;

use super::facade::SemantixStorage;
use super::keys::StorageKey;

/// Insertion policy for [`SemantixStorage::add_to_list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    /// Refuse duplicates, judged by `unique_key` field equality
    pub unique: bool,
    /// Field compared for uniqueness (exact value equality, not deep
    /// item equality)
    pub unique_key: Option<&'static str>,
    /// Insert at the head instead of the tail
    pub prepend: bool,
}

impl ListOptions {
    pub fn unique_prepend(unique_key: &'static str) -> Self {
        Self {
            unique: true,
            unique_key: Some(unique_key),
            prepend: true,
        }
    }
}

fn field_matches(item: &Value, field: &str, expected: &Value) -> bool {
    item.get(field).map(|v| v == expected).unwrap_or(false)
}

fn as_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => {
            if !other.is_null() {
                warn!("list key held a non-array value, treating as empty");
            }
            Vec::new()
        }
    }
}

impl SemantixStorage {
    /// Append or prepend `item`. With `unique` set and a matching
    /// `unique_key` value already present, this is an idempotent no-op:
    /// the unchanged list is returned and nothing is written.
    pub async fn add_to_list(&self, key: StorageKey, item: Value, opts: ListOptions) -> Vec<Value> {
        let mut list = as_list(self.get(key).await);

        if opts.unique {
            if let Some(field) = opts.unique_key {
                if let Some(id) = item.get(field) {
                    if list.iter().any(|existing| field_matches(existing, field, id)) {
                        return list;
                    }
                }
            }
        }

        if opts.prepend {
            list.insert(0, item);
        } else {
            list.push(item);
        }
        self.set(key, Value::Array(list.clone())).await;
        list
    }

    /// Remove all items whose `field` equals `value`. Writes back only
    /// when something was actually removed. Returns `true` on removal.
    pub async fn remove_from_list(&self, key: StorageKey, field: &str, value: &Value) -> bool {
        let mut list = as_list(self.get(key).await);
        let original_len = list.len();
        list.retain(|item| !field_matches(item, field, value));

        if list.len() == original_len {
            return false;
        }
        self.set(key, Value::Array(list)).await
    }

    /// Shallow-merge `updates` into the first item whose `field` equals
    /// `value`. Silent no-op when no item matches. Returns `true` when a
    /// match was found and written back.
    pub async fn update_in_list(
        &self,
        key: StorageKey,
        field: &str,
        value: &Value,
        updates: Value,
    ) -> bool {
        let mut list = as_list(self.get(key).await);
        let Some(index) = list.iter().position(|item| field_matches(item, field, value)) else {
            return false;
        };

        if let (Value::Object(target), Value::Object(patch)) = (&mut list[index], updates) {
            for (k, v) in patch {
                target.insert(k, v);
            }
        }
        self.set(key, Value::Array(list)).await
    }

    /// First item whose `field` equals `value`, if any.
    pub async fn find_in_list(&self, key: StorageKey, field: &str, value: &Value) -> Option<Value> {
        as_list(self.get(key).await)
            .into_iter()
            .find(|item| field_matches(item, field, value))
    }

    pub async fn exists_in_list(&self, key: StorageKey, field: &str, value: &Value) -> bool {
        self.find_in_list(key, field, value).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{channel, BridgeClient, MemoryBackend, StorageHost};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn storage_over_memory() -> SemantixStorage {
        let (client_end, host_end) = channel();
        StorageHost::spawn(
            Box::new(MemoryBackend::new()),
            host_end.requests,
            host_end.responses,
        );
        let client = BridgeClient::new(
            client_end.outbound,
            client_end.inbound,
            Duration::from_secs(5),
        );
        SemantixStorage::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_add_unique_is_idempotent() {
        let storage = storage_over_memory();
        let key = StorageKey::Favorites;
        let opts = ListOptions::unique_prepend("conversationId");

        let first = storage
            .add_to_list(key, json!({"conversationId": "c1", "title": "a"}), opts)
            .await;
        assert_eq!(first.len(), 1);

        // Same key, different body: must not insert and must not overwrite
        let second = storage
            .add_to_list(key, json!({"conversationId": "c1", "title": "b"}), opts)
            .await;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0]["title"], "a");
    }

    #[tokio::test]
    async fn test_prepend_keeps_newest_first() {
        let storage = storage_over_memory();
        let key = StorageKey::Favorites;
        let opts = ListOptions::unique_prepend("conversationId");

        for i in 0..3 {
            storage
                .add_to_list(key, json!({"conversationId": format!("c{i}")}), opts)
                .await;
        }
        let list = storage.get(key).await;
        assert_eq!(list[0]["conversationId"], "c2");
        assert_eq!(list[2]["conversationId"], "c0");
    }

    #[tokio::test]
    async fn test_remove_drops_all_matches() {
        let storage = storage_over_memory();
        let key = StorageKey::Projects;
        storage
            .set(
                key,
                json!([{"id": "a"}, {"id": "b"}, {"id": "a"}]),
            )
            .await;

        assert!(storage.remove_from_list(key, "id", &json!("a")).await);
        assert_eq!(storage.get(key).await, json!([{"id": "b"}]));

        // Nothing left to remove: no write, returns false
        assert!(!storage.remove_from_list(key, "id", &json!("a")).await);
    }

    #[tokio::test]
    async fn test_update_merges_first_match_only() {
        let storage = storage_over_memory();
        let key = StorageKey::Projects;
        storage
            .set(key, json!([{"id": "a", "name": "x"}, {"id": "a", "name": "y"}]))
            .await;

        assert!(
            storage
                .update_in_list(key, "id", &json!("a"), json!({"name": "z"}))
                .await
        );
        let list = storage.get(key).await;
        assert_eq!(list[0]["name"], "z");
        assert_eq!(list[1]["name"], "y");
    }

    #[tokio::test]
    async fn test_update_missing_is_silent_noop() {
        let storage = storage_over_memory();
        let key = StorageKey::Projects;
        storage.set(key, json!([{"id": "a"}])).await;

        assert!(
            !storage
                .update_in_list(key, "id", &json!("ghost"), json!({"name": "z"}))
                .await
        );
        assert_eq!(storage.get(key).await, json!([{"id": "a"}]));
    }

    #[tokio::test]
    async fn test_find_and_exists() {
        let storage = storage_over_memory();
        let key = StorageKey::Favorites;
        storage.set(key, json!([{"conversationId": "c1"}])).await;

        assert!(storage.exists_in_list(key, "conversationId", &json!("c1")).await);
        assert!(!storage.exists_in_list(key, "conversationId", &json!("c2")).await);
        let found = storage.find_in_list(key, "conversationId", &json!("c1")).await;
        assert_eq!(found.unwrap()["conversationId"], "c1");
    }
}
