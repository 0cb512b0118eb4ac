//! Shared machinery for the favorites and projects managers: the
//! TTL'd full-list cache, selected-folder session state, folder-scoped
//! queries, and the organized read model the UI renders from.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::constants::LIST_CACHE_TTL_MS;
use crate::folders::SectionFoldersManager;
use crate::models::{FolderTreeNode, Folder, Section};
use crate::store::{ListOptions, SemantixStorage, StorageKey};

use super::events::{ChangeAction, ChangeNotifier};

/// An item stored in one of the array-valued entity keys.
pub trait EntityRecord: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Wire name of the unique-id field (`conversationId` / `id`)
    const ID_FIELD: &'static str;
    fn id(&self) -> &str;
    fn folder_id(&self) -> Option<&str>;
}

/// The single read model for rendering a section's whole hierarchy in
/// one pass. Recomputed from scratch on every call, never patched
/// incrementally.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizedStructure<T> {
    pub root_items: Vec<T>,
    pub folders: Vec<OrganizedFolder<T>>,
    pub total_items: usize,
    pub total_folders: usize,
}

/// A folder tree node decorated with its bucket of items.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizedFolder<T> {
    #[serde(flatten)]
    pub folder: Folder,
    pub items: Vec<T>,
    pub children: Vec<OrganizedFolder<T>>,
}

struct CachedList<T> {
    fetched_at: Instant,
    items: Vec<T>,
}

/// Selected-folder session state: `Unloaded` until the first operation
/// needing it, then pinned to a validated folder id (or root).
enum SelectedState {
    Unloaded,
    Loaded(Option<String>),
}

pub(crate) struct EntityCore<T> {
    storage: SemantixStorage,
    folders: Arc<SectionFoldersManager>,
    key: StorageKey,
    section: Section,
    cache: Mutex<Option<CachedList<T>>>,
    cache_ttl: Duration,
    selected: Mutex<SelectedState>,
    pub(crate) notifier: ChangeNotifier,
}

impl<T: EntityRecord> EntityCore<T> {
    pub(crate) fn new(
        storage: SemantixStorage,
        folders: Arc<SectionFoldersManager>,
        key: StorageKey,
        section: Section,
    ) -> Self {
        Self {
            storage,
            folders,
            key,
            section,
            cache: Mutex::new(None),
            cache_ttl: Duration::from_millis(LIST_CACHE_TTL_MS),
            selected: Mutex::new(SelectedState::Unloaded),
            notifier: ChangeNotifier::new(section),
        }
    }

    pub(crate) fn storage(&self) -> &SemantixStorage {
        &self.storage
    }

    pub(crate) fn folders(&self) -> &Arc<SectionFoldersManager> {
        &self.folders
    }

    pub(crate) fn key(&self) -> StorageKey {
        self.key
    }

    // ===== List access =====

    /// Full list, served from the instance cache when younger than the
    /// TTL. Mutations through this instance invalidate eagerly; remote
    /// mutations are only observed once the TTL lapses.
    pub(crate) async fn get_all(&self) -> Vec<T> {
        {
            let cache = self.cache.lock();
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.cache_ttl {
                    return cached.items.clone();
                }
            }
        }

        let items = self.fetch_all().await;
        *self.cache.lock() = Some(CachedList {
            fetched_at: Instant::now(),
            items: items.clone(),
        });
        items
    }

    async fn fetch_all(&self) -> Vec<T> {
        match self.storage.get(self.key).await {
            Value::Array(values) => values
                .into_iter()
                .filter_map(|v| match serde_json::from_value(v) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        warn!(key = %self.key, error = %e, "skipping malformed stored item");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The raw stored array, unknown fields and all. Used by export.
    pub(crate) async fn raw_list(&self) -> Vec<Value> {
        match self.storage.get(self.key).await {
            Value::Array(values) => values,
            _ => Vec::new(),
        }
    }

    pub(crate) fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    pub(crate) async fn find(&self, id: &str) -> Option<T> {
        self.get_all().await.into_iter().find(|item| item.id() == id)
    }

    /// Insert with the uniqueness + newest-first invariants. Returns the
    /// resulting list length so callers can tell whether the write took.
    pub(crate) async fn insert_unique_prepend(&self, item: &T) -> usize {
        let Ok(value) = serde_json::to_value(item) else {
            return 0;
        };
        let list = self
            .storage
            .add_to_list(self.key, value, ListOptions::unique_prepend(T::ID_FIELD))
            .await;
        self.invalidate();
        list.len()
    }

    pub(crate) async fn remove_by_id(&self, id: &str) -> bool {
        let removed = self
            .storage
            .remove_from_list(self.key, T::ID_FIELD, &json!(id))
            .await;
        if removed {
            self.invalidate();
        }
        removed
    }

    pub(crate) async fn patch_by_id(&self, id: &str, updates: Value) -> bool {
        let updated = self
            .storage
            .update_in_list(self.key, T::ID_FIELD, &json!(id), updates)
            .await;
        if updated {
            self.invalidate();
        }
        updated
    }

    // ===== Folder placement =====

    /// Resolve where a new item lands: an explicit choice wins, an unset
    /// choice falls back to the selected folder (when enabled), and a
    /// resolved folder that no longer exists silently redirects to root.
    pub(crate) async fn resolve_target_folder(
        &self,
        requested: Option<Option<String>>,
        use_selected_folder: bool,
    ) -> Option<String> {
        let candidate = match requested {
            Some(explicit) => explicit,
            None if use_selected_folder => self.selected_folder_id().await,
            None => None,
        };
        match candidate {
            Some(id) => {
                if self.folders.get(&id).await.is_some() {
                    Some(id)
                } else {
                    warn!(section = %self.section, folder = id, "target folder missing, placing at root");
                    None
                }
            }
            None => None,
        }
    }

    // ===== Selected folder state =====

    /// Lazily loads the persisted selection on first use, clearing it
    /// (and persisting the clear) when the referenced folder no longer
    /// exists.
    pub(crate) async fn selected_folder_id(&self) -> Option<String> {
        if let SelectedState::Loaded(value) = &*self.selected.lock() {
            return value.clone();
        }

        let map = self.storage.get(StorageKey::SelectedFolders).await;
        let persisted = map
            .get(self.section.as_str())
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let healed = match persisted {
            Some(id) if self.folders.get(&id).await.is_some() => Some(id),
            Some(stale) => {
                warn!(section = %self.section, folder = stale, "clearing stale selected folder");
                self.persist_selected(None).await;
                None
            }
            None => None,
        };

        *self.selected.lock() = SelectedState::Loaded(healed.clone());
        healed
    }

    pub(crate) async fn set_selected_folder(&self, folder_id: Option<String>) -> bool {
        if let Some(id) = folder_id.as_deref() {
            if self.folders.get(id).await.is_none() {
                return false;
            }
        }

        self.persist_selected(folder_id.clone()).await;
        *self.selected.lock() = SelectedState::Loaded(folder_id.clone());
        self.notifier.emit(
            ChangeAction::FolderSelected,
            Some(json!({ "folderId": folder_id })),
        );
        true
    }

    async fn persist_selected(&self, folder_id: Option<String>) {
        let mut map = match self.storage.get(StorageKey::SelectedFolders).await {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        map.insert(
            self.section.as_str().to_string(),
            folder_id.map(Value::String).unwrap_or(Value::Null),
        );
        self.storage
            .set(StorageKey::SelectedFolders, Value::Object(map))
            .await;
    }

    // ===== Folder-scoped queries =====

    /// Flat filter by exact folder match; `None` selects root items.
    /// Items whose stored `folderId` is absent count as root.
    pub(crate) async fn get_by_folder(&self, folder_id: Option<&str>) -> Vec<T> {
        self.get_all()
            .await
            .into_iter()
            .filter(|item| item.folder_id() == folder_id)
            .collect()
    }

    /// Count items in a folder and all its descendants. Root is
    /// special-cased to the non-recursive root-level count, excluding
    /// every folder's contents.
    pub(crate) async fn count_in_folder_recursive(&self, folder_id: Option<&str>) -> usize {
        let Some(folder_id) = folder_id else {
            return self.get_by_folder(None).await.len();
        };

        let folders = self.folders.get_folders().await;
        let mut by_parent: HashMap<&str, Vec<&str>> = HashMap::new();
        for folder in &folders {
            if let Some(parent) = folder.parent_id.as_deref() {
                by_parent.entry(parent).or_default().push(&folder.id);
            }
        }

        let mut in_scope = std::collections::HashSet::new();
        let mut stack = vec![folder_id];
        while let Some(id) = stack.pop() {
            if in_scope.insert(id.to_string()) {
                if let Some(children) = by_parent.get(id) {
                    stack.extend(children.iter().copied());
                }
            }
        }

        self.get_all()
            .await
            .iter()
            .filter(|item| {
                item.folder_id()
                    .map(|f| in_scope.contains(f))
                    .unwrap_or(false)
            })
            .count()
    }

    /// Remove every item in exactly this folder, one by one, emitting a
    /// removal event per item. Returns the count actually deleted.
    pub(crate) async fn delete_in_folder(&self, folder_id: &str) -> usize {
        let doomed: Vec<T> = self.get_by_folder(Some(folder_id)).await;
        let mut deleted = 0;
        for item in doomed {
            if self.remove_by_id(item.id()).await {
                deleted += 1;
                self.emit(ChangeAction::Removed, Some(&item));
            }
        }
        deleted
    }

    // ===== Organized read model =====

    pub(crate) async fn organized(&self) -> OrganizedStructure<T> {
        let items = self.get_all().await;
        let tree = self.folders.get_tree().await;

        let total_items = items.len();
        let mut buckets: HashMap<Option<String>, Vec<T>> = HashMap::new();
        for item in items {
            buckets
                .entry(item.folder_id().map(str::to_string))
                .or_default()
                .push(item);
        }

        let root_items = buckets.remove(&None).unwrap_or_default();
        let folders = decorate(&tree, &mut buckets);
        let total_folders = count_nodes(&tree);

        OrganizedStructure {
            root_items,
            folders,
            total_items,
            total_folders,
        }
    }

    // ===== Notification =====

    pub(crate) fn emit(&self, action: ChangeAction, item: Option<&T>) {
        let payload = item.and_then(|i| serde_json::to_value(i).ok());
        self.notifier.emit(action, payload);
    }
}

fn decorate<T: EntityRecord>(
    nodes: &[FolderTreeNode],
    buckets: &mut HashMap<Option<String>, Vec<T>>,
) -> Vec<OrganizedFolder<T>> {
    nodes
        .iter()
        .map(|node| OrganizedFolder {
            folder: node.folder.clone(),
            items: buckets
                .remove(&Some(node.folder.id.clone()))
                .unwrap_or_default(),
            children: decorate(&node.children, buckets),
        })
        .collect()
}

fn count_nodes(nodes: &[FolderTreeNode]) -> usize {
    nodes.iter().map(|n| 1 + count_nodes(&n.children)).sum()
}
