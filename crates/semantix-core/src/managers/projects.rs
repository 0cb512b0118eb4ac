//! Projects: user-defined workspaces with generated ids.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use crate::constants::MAX_PROJECTS;
use crate::folders::SectionFoldersManager;
use crate::models::{now_ms, NewProject, ProjectItem, ProjectPatch, Section};
use crate::store::{SemantixStorage, StorageKey};

use super::entity::{EntityCore, EntityRecord, OrganizedStructure};
use super::events::{ActionCallback, ChangeAction, ChangeEvent};

impl EntityRecord for ProjectItem {
    const ID_FIELD: &'static str = "id";

    fn id(&self) -> &str {
        &self.id
    }

    fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }
}

pub struct ProjectsManager {
    core: EntityCore<ProjectItem>,
}

impl ProjectsManager {
    pub fn new(storage: SemantixStorage, folders: Arc<SectionFoldersManager>) -> Self {
        Self {
            core: EntityCore::new(storage, folders, StorageKey::Projects, Section::Projects),
        }
    }

    pub fn folders(&self) -> &Arc<SectionFoldersManager> {
        self.core.folders()
    }

    // ===== CRUD =====

    /// Create a project. Refuses (returns `None`, logs) on an empty
    /// trimmed name or when `MAX_PROJECTS` is reached.
    pub async fn add(&self, new: NewProject) -> Option<ProjectItem> {
        if new.name.trim().is_empty() {
            warn!("refusing project with empty name");
            return None;
        }

        let current = self.core.get_all().await;
        if current.len() >= MAX_PROJECTS {
            warn!(limit = MAX_PROJECTS, "projects limit reached, refusing add");
            return None;
        }

        let folder_id = self
            .core
            .resolve_target_folder(new.folder_id.clone(), new.use_selected_folder)
            .await;

        let item = new.into_item(folder_id);
        self.core.insert_unique_prepend(&item).await;
        self.core.emit(ChangeAction::Added, Some(&item));
        Some(item)
    }

    pub async fn remove(&self, id: &str) -> bool {
        let Some(item) = self.core.find(id).await else {
            return false;
        };
        if !self.core.remove_by_id(id).await {
            return false;
        }
        self.core.emit(ChangeAction::Removed, Some(&item));
        true
    }

    /// Patch mutable fields and refresh `updated_at`. `id` and
    /// `created_at` cannot be expressed in a [`ProjectPatch`].
    pub async fn update(&self, id: &str, patch: ProjectPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        if let Some(name) = patch.name.as_deref() {
            if name.trim().is_empty() {
                warn!("refusing project rename to empty name");
                return false;
            }
        }

        let Ok(mut updates) = serde_json::to_value(&patch) else {
            return false;
        };
        if let Some(map) = updates.as_object_mut() {
            if let Some(name) = patch.name.as_deref() {
                map.insert("name".to_string(), serde_json::json!(name.trim()));
            }
            map.insert("updatedAt".to_string(), serde_json::json!(now_ms()));
        }

        let updated = self.core.patch_by_id(id, updates).await;
        if updated {
            if let Some(item) = self.core.find(id).await {
                self.core.emit(ChangeAction::Updated, Some(&item));
            }
        }
        updated
    }

    pub async fn move_to_folder(&self, id: &str, folder_id: Option<String>) -> bool {
        if let Some(folder) = folder_id.as_deref() {
            if self.core.folders().get(folder).await.is_none() {
                return false;
            }
        }
        let moved = self
            .core
            .patch_by_id(
                id,
                serde_json::json!({ "folderId": folder_id, "updatedAt": now_ms() }),
            )
            .await;
        if moved {
            if let Some(item) = self.core.find(id).await {
                self.core.emit(ChangeAction::Moved, Some(&item));
            }
        }
        moved
    }

    // ===== Queries =====

    pub async fn get_all(&self) -> Vec<ProjectItem> {
        self.core.get_all().await
    }

    pub async fn get(&self, id: &str) -> Option<ProjectItem> {
        self.core.find(id).await
    }

    pub async fn get_by_folder(&self, folder_id: Option<&str>) -> Vec<ProjectItem> {
        self.core.get_by_folder(folder_id).await
    }

    pub async fn count_in_folder_recursive(&self, folder_id: Option<&str>) -> usize {
        self.core.count_in_folder_recursive(folder_id).await
    }

    pub async fn delete_in_folder(&self, folder_id: &str) -> usize {
        self.core.delete_in_folder(folder_id).await
    }

    pub async fn get_organized_structure(&self) -> OrganizedStructure<ProjectItem> {
        self.core.organized().await
    }

    // ===== Selected folder =====

    pub async fn get_selected_folder_id(&self) -> Option<String> {
        self.core.selected_folder_id().await
    }

    pub async fn set_selected_folder(&self, folder_id: Option<String>) -> bool {
        self.core.set_selected_folder(folder_id).await
    }

    // ===== Change notification =====

    pub fn on(&self, action: ChangeAction, callback: ActionCallback) -> u64 {
        self.core.notifier.on(action, callback)
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        self.core.notifier.unsubscribe(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.core.notifier.subscribe()
    }
}
