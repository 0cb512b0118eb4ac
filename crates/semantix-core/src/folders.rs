//! Folder hierarchy manager, one instance per section.
//!
//! Folders are stored as a flat array with parent pointers; the tree is
//! rebuilt on demand from a parentId → children index rather than
//! rescanning the flat list per level. Depth is capped at
//! [`MAX_FOLDER_DEPTH`] (root, child, grandchild).

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::constants::{
    DEFAULT_FOLDER_COLOR, DEFAULT_FOLDER_ICON, MAX_FOLDERS_PER_SECTION, MAX_FOLDER_DEPTH,
};
use crate::models::{now_ms, Folder, FolderTreeNode, Section};
use crate::store::{ListOptions, SemantixStorage, StorageKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FolderAction {
    Created,
    Renamed,
    Updated,
    Deleted,
    Collapsed,
}

/// Payload handed to folder change listeners.
#[derive(Debug, Clone, Serialize)]
pub struct FolderChange {
    pub section: Section,
    pub action: FolderAction,
    pub folder_id: String,
}

pub type FolderChangeCallback = Arc<dyn Fn(&FolderChange) + Send + Sync>;

pub struct SectionFoldersManager {
    storage: SemantixStorage,
    section: Section,
    key: StorageKey,
    listeners: RwLock<HashMap<u64, FolderChangeCallback>>,
    next_subscription: AtomicU64,
}

impl SectionFoldersManager {
    pub fn new(storage: SemantixStorage, section: Section) -> Self {
        Self {
            storage,
            section,
            key: StorageKey::Folders(section),
            listeners: RwLock::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    pub fn section(&self) -> Section {
        self.section
    }

    // ===== Reads =====

    /// All folder records for this section. Malformed entries are
    /// skipped, not fatal.
    pub async fn get_folders(&self) -> Vec<Folder> {
        match self.storage.get(self.key).await {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub async fn get(&self, id: &str) -> Option<Folder> {
        self.get_folders().await.into_iter().find(|f| f.id == id)
    }

    pub async fn count(&self) -> usize {
        self.get_folders().await.len()
    }

    pub async fn get_children(&self, parent_id: Option<&str>) -> Vec<Folder> {
        let mut children: Vec<Folder> = self
            .get_folders()
            .await
            .into_iter()
            .filter(|f| f.parent_id.as_deref() == parent_id)
            .collect();
        sort_siblings(&mut children);
        children
    }

    /// Build the full tree. The parentId → children index is built once;
    /// children are sorted by `order`, then `created_at`.
    pub async fn get_tree(&self) -> Vec<FolderTreeNode> {
        let folders = self.get_folders().await;
        build_tree(&folders)
    }

    /// Depth of a folder: 0 for roots. Returns `None` for unknown ids or
    /// broken parent chains.
    pub async fn depth(&self, id: &str) -> Option<usize> {
        let folders = self.get_folders().await;
        depth_of(&folders, id)
    }

    pub async fn can_create_root_folder(&self) -> bool {
        self.count().await < MAX_FOLDERS_PER_SECTION
    }

    pub async fn can_create_subfolder(&self, parent_id: &str) -> bool {
        let folders = self.get_folders().await;
        if folders.len() >= MAX_FOLDERS_PER_SECTION {
            return false;
        }
        match depth_of(&folders, parent_id) {
            Some(depth) => depth + 1 <= MAX_FOLDER_DEPTH,
            None => false,
        }
    }

    // ===== Mutations =====

    /// Create a folder. Refuses (returns `None`, logs) on empty name,
    /// section limit, unknown parent, or depth overflow.
    pub async fn create(&self, name: &str, parent_id: Option<&str>) -> Option<Folder> {
        let name = name.trim();
        if name.is_empty() {
            warn!(section = %self.section, "refusing folder with empty name");
            return None;
        }

        let folders = self.get_folders().await;
        if folders.len() >= MAX_FOLDERS_PER_SECTION {
            warn!(section = %self.section, limit = MAX_FOLDERS_PER_SECTION, "folder limit reached");
            return None;
        }
        if let Some(parent) = parent_id {
            match depth_of(&folders, parent) {
                Some(depth) if depth + 1 <= MAX_FOLDER_DEPTH => {}
                Some(_) => {
                    warn!(section = %self.section, parent, "folder depth limit reached");
                    return None;
                }
                None => {
                    warn!(section = %self.section, parent, "parent folder does not exist");
                    return None;
                }
            }
        }

        let order = folders
            .iter()
            .filter(|f| f.parent_id.as_deref() == parent_id)
            .count() as u32;
        let now = now_ms();
        let folder = Folder {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
            color: DEFAULT_FOLDER_COLOR.to_string(),
            icon: DEFAULT_FOLDER_ICON.to_string(),
            order,
            collapsed: false,
            created_at: now,
            updated_at: now,
        };

        let item = serde_json::to_value(&folder).ok()?;
        self.storage
            .add_to_list(self.key, item, ListOptions::unique_prepend("id"))
            .await;
        self.emit(FolderAction::Created, &folder.id);
        Some(folder)
    }

    pub async fn rename(&self, id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let updated = self
            .storage
            .update_in_list(
                self.key,
                "id",
                &json!(id),
                json!({"name": name, "updatedAt": now_ms()}),
            )
            .await;
        if updated {
            self.emit(FolderAction::Renamed, id);
        }
        updated
    }

    /// Recolor and/or re-icon a folder.
    pub async fn update(&self, id: &str, color: Option<&str>, icon: Option<&str>) -> bool {
        if color.is_none() && icon.is_none() {
            return false;
        }
        let mut patch = serde_json::Map::new();
        if let Some(color) = color {
            patch.insert("color".to_string(), json!(color));
        }
        if let Some(icon) = icon {
            patch.insert("icon".to_string(), json!(icon));
        }
        patch.insert("updatedAt".to_string(), json!(now_ms()));

        let updated = self
            .storage
            .update_in_list(self.key, "id", &json!(id), serde_json::Value::Object(patch))
            .await;
        if updated {
            self.emit(FolderAction::Updated, id);
        }
        updated
    }

    pub async fn set_collapsed(&self, id: &str, collapsed: bool) -> bool {
        let updated = self
            .storage
            .update_in_list(self.key, "id", &json!(id), json!({"collapsed": collapsed}))
            .await;
        if updated {
            self.emit(FolderAction::Collapsed, id);
        }
        updated
    }

    /// Delete a folder and all its descendants. `on_before_delete` runs
    /// for every folder id (deepest first) before that folder's record is
    /// removed, so entity managers can evacuate or drop its contents.
    /// Returns the number of folders removed.
    pub async fn delete<F, Fut>(&self, id: &str, mut on_before_delete: F) -> usize
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = ()>,
    {
        let folders = self.get_folders().await;
        if !folders.iter().any(|f| f.id == id) {
            return 0;
        }

        let doomed = subtree_ids_deepest_first(&folders, id);
        let mut removed = 0;
        for folder_id in doomed {
            on_before_delete(folder_id.clone()).await;
            if self
                .storage
                .remove_from_list(self.key, "id", &json!(folder_id))
                .await
            {
                removed += 1;
                self.emit(FolderAction::Deleted, &folder_id);
            }
        }
        removed
    }

    // ===== Change notification =====

    pub fn on_change(&self, callback: FolderChangeCallback) -> u64 {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.listeners.write().insert(id, callback);
        id
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        self.listeners.write().remove(&id).is_some()
    }

    fn emit(&self, action: FolderAction, folder_id: &str) {
        let change = FolderChange {
            section: self.section,
            action,
            folder_id: folder_id.to_string(),
        };
        let listeners = self.listeners.read();
        for (id, callback) in listeners.iter() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(&change);
            }));
            if result.is_err() {
                warn!(subscription = id, "folder change listener panicked");
            }
        }
    }
}

fn sort_siblings(folders: &mut [Folder]) {
    folders.sort_by(|a, b| a.order.cmp(&b.order).then(a.created_at.cmp(&b.created_at)));
}

fn build_tree(folders: &[Folder]) -> Vec<FolderTreeNode> {
    let mut by_parent: HashMap<Option<&str>, Vec<&Folder>> = HashMap::new();
    for folder in folders {
        by_parent
            .entry(folder.parent_id.as_deref())
            .or_default()
            .push(folder);
    }

    fn attach(by_parent: &HashMap<Option<&str>, Vec<&Folder>>, parent: Option<&str>) -> Vec<FolderTreeNode> {
        let mut nodes: Vec<FolderTreeNode> = by_parent
            .get(&parent)
            .map(|children| {
                children
                    .iter()
                    .map(|folder| FolderTreeNode {
                        folder: (*folder).clone(),
                        children: attach(by_parent, Some(folder.id.as_str())),
                    })
                    .collect()
            })
            .unwrap_or_default();
        nodes.sort_by(|a, b| {
            a.folder
                .order
                .cmp(&b.folder.order)
                .then(a.folder.created_at.cmp(&b.folder.created_at))
        });
        nodes
    }

    attach(&by_parent, None)
}

fn depth_of(folders: &[Folder], id: &str) -> Option<usize> {
    let by_id: HashMap<&str, &Folder> = folders.iter().map(|f| (f.id.as_str(), f)).collect();
    let mut current = by_id.get(id)?;
    let mut depth = 0;
    while let Some(parent_id) = current.parent_id.as_deref() {
        current = by_id.get(parent_id)?;
        depth += 1;
        if depth > folders.len() {
            // Cycle in parent pointers
            return None;
        }
    }
    Some(depth)
}

/// All ids in the subtree rooted at `id`, ordered so descendants come
/// before their ancestors.
fn subtree_ids_deepest_first(folders: &[Folder], id: &str) -> Vec<String> {
    let mut by_parent: HashMap<&str, Vec<&str>> = HashMap::new();
    for folder in folders {
        if let Some(parent) = folder.parent_id.as_deref() {
            by_parent.entry(parent).or_default().push(&folder.id);
        }
    }

    let mut ordered = Vec::new();
    fn visit(by_parent: &HashMap<&str, Vec<&str>>, id: &str, out: &mut Vec<String>) {
        if let Some(children) = by_parent.get(id) {
            for child in children {
                visit(by_parent, child, out);
            }
        }
        out.push(id.to_string());
    }
    visit(&by_parent, id, &mut ordered);
    ordered
}
