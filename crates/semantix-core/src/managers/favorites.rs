//! Favorites: bookmarked conversations, at most one per conversation id.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

use crate::constants::MAX_FAVORITES;
use crate::folders::SectionFoldersManager;
use crate::models::{now_ms, FavoriteItem, FavoritePatch, NewFavorite, Section};
use crate::store::{SemantixStorage, StorageKey};

use super::entity::{EntityCore, EntityRecord, OrganizedStructure};
use super::events::{ActionCallback, ChangeAction, ChangeEvent};

impl EntityRecord for FavoriteItem {
    const ID_FIELD: &'static str = "conversationId";

    fn id(&self) -> &str {
        &self.conversation_id
    }

    fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }
}

/// How `import_from_json` treats existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Add only items whose id is not already present; each one goes
    /// through `add`, so validation, limits and folder fallback apply.
    Merge,
    /// Write the parsed array directly, bypassing validation entirely.
    Replace,
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

pub struct FavoritesManager {
    core: EntityCore<FavoriteItem>,
}

impl FavoritesManager {
    pub fn new(storage: SemantixStorage, folders: Arc<SectionFoldersManager>) -> Self {
        Self {
            core: EntityCore::new(storage, folders, StorageKey::Favorites, Section::Favorites),
        }
    }

    pub fn folders(&self) -> &Arc<SectionFoldersManager> {
        self.core.folders()
    }

    // ===== CRUD =====

    /// Add a favorite. Returns the stored item, the already-present item
    /// for a duplicate conversation id, or `None` when validation or the
    /// `MAX_FAVORITES` limit refuses the add.
    pub async fn add(&self, new: NewFavorite) -> Option<FavoriteItem> {
        if new.conversation_id.trim().is_empty() {
            warn!("refusing favorite without conversation id");
            return None;
        }

        if let Some(existing) = self.core.find(&new.conversation_id).await {
            return Some(existing);
        }

        let current = self.core.get_all().await;
        if current.len() >= MAX_FAVORITES {
            warn!(limit = MAX_FAVORITES, "favorites limit reached, refusing add");
            return None;
        }

        let folder_id = self
            .core
            .resolve_target_folder(new.folder_id.clone(), new.use_selected_folder)
            .await;

        let item = FavoriteItem {
            conversation_id: new.conversation_id,
            title: new.title,
            added_at: now_ms(),
            provider: new.provider,
            url: new.url,
            tags: new.tags,
            folder_id,
        };
        self.core.insert_unique_prepend(&item).await;
        self.core.emit(ChangeAction::Added, Some(&item));
        Some(item)
    }

    /// Remove by conversation id. The removed item is looked up first so
    /// listeners get its payload.
    pub async fn remove(&self, conversation_id: &str) -> bool {
        let Some(item) = self.core.find(conversation_id).await else {
            return false;
        };
        if !self.core.remove_by_id(conversation_id).await {
            return false;
        }
        self.core.emit(ChangeAction::Removed, Some(&item));
        true
    }

    pub async fn is_favorite(&self, conversation_id: &str) -> bool {
        self.core.find(conversation_id).await.is_some()
    }

    /// Flip favorite state. Defined purely in terms of `is_favorite` +
    /// `add`/`remove`, so two racing toggles may interleave; the contract
    /// is "at most one stored item after settling", not atomicity.
    /// Returns `true` when the conversation ends up favorited.
    pub async fn toggle(&self, new: NewFavorite) -> bool {
        let conversation_id = new.conversation_id.clone();
        if self.is_favorite(&conversation_id).await {
            self.remove(&conversation_id).await;
            false
        } else {
            self.add(new).await.is_some()
        }
    }

    /// Patch mutable fields. `conversation_id` and `added_at` cannot be
    /// expressed in a [`FavoritePatch`] at all.
    pub async fn update(&self, conversation_id: &str, patch: FavoritePatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        let Ok(updates) = serde_json::to_value(&patch) else {
            return false;
        };
        let updated = self.core.patch_by_id(conversation_id, updates).await;
        if updated {
            if let Some(item) = self.core.find(conversation_id).await {
                self.core.emit(ChangeAction::Updated, Some(&item));
            }
        }
        updated
    }

    /// Move a favorite into a folder (or to root with `None`). A
    /// non-null target must exist.
    pub async fn move_to_folder(&self, conversation_id: &str, folder_id: Option<String>) -> bool {
        if let Some(id) = folder_id.as_deref() {
            if self.core.folders().get(id).await.is_none() {
                return false;
            }
        }
        let moved = self
            .core
            .patch_by_id(conversation_id, serde_json::json!({ "folderId": folder_id }))
            .await;
        if moved {
            if let Some(item) = self.core.find(conversation_id).await {
                self.core.emit(ChangeAction::Moved, Some(&item));
            }
        }
        moved
    }

    // ===== Queries =====

    pub async fn get_all(&self) -> Vec<FavoriteItem> {
        self.core.get_all().await
    }

    pub async fn get(&self, conversation_id: &str) -> Option<FavoriteItem> {
        self.core.find(conversation_id).await
    }

    pub async fn get_by_folder(&self, folder_id: Option<&str>) -> Vec<FavoriteItem> {
        self.core.get_by_folder(folder_id).await
    }

    pub async fn get_by_tag(&self, tag: &str) -> Vec<FavoriteItem> {
        self.core
            .get_all()
            .await
            .into_iter()
            .filter(|item| {
                item.tags
                    .as_ref()
                    .map(|tags| tags.iter().any(|t| t == tag))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub async fn count_in_folder_recursive(&self, folder_id: Option<&str>) -> usize {
        self.core.count_in_folder_recursive(folder_id).await
    }

    pub async fn delete_in_folder(&self, folder_id: &str) -> usize {
        self.core.delete_in_folder(folder_id).await
    }

    pub async fn get_organized_structure(&self) -> OrganizedStructure<FavoriteItem> {
        self.core.organized().await
    }

    // ===== Selected folder =====

    pub async fn get_selected_folder_id(&self) -> Option<String> {
        self.core.selected_folder_id().await
    }

    pub async fn set_selected_folder(&self, folder_id: Option<String>) -> bool {
        self.core.set_selected_folder(folder_id).await
    }

    // ===== Import / export =====

    /// Pretty-printed JSON array of the raw stored list — a straight
    /// array, no envelope or version field.
    pub async fn export_to_json(&self) -> String {
        let raw = self.core.raw_list().await;
        serde_json::to_string_pretty(&raw).unwrap_or_else(|_| "[]".to_string())
    }

    /// Import favorites from an exported array. Returns `None` when the
    /// JSON is not an array.
    pub async fn import_from_json(&self, json: &str, mode: ImportMode) -> Option<ImportSummary> {
        let parsed: Value = serde_json::from_str(json).ok()?;
        let Value::Array(entries) = parsed else {
            warn!("favorites import payload is not an array");
            return None;
        };

        let mut summary = ImportSummary::default();
        match mode {
            ImportMode::Replace => {
                summary.imported = entries.len();
                self.core
                    .storage()
                    .set(self.core.key(), Value::Array(entries))
                    .await;
                self.core.invalidate();
            }
            ImportMode::Merge => {
                for entry in entries {
                    let Ok(item) = serde_json::from_value::<FavoriteItem>(entry) else {
                        summary.skipped += 1;
                        continue;
                    };
                    if self.is_favorite(&item.conversation_id).await {
                        summary.skipped += 1;
                        continue;
                    }
                    let mut new = NewFavorite::new(item.conversation_id, item.title, item.provider);
                    new.url = item.url;
                    new.tags = item.tags;
                    new.folder_id = Some(item.folder_id);
                    if self.add(new).await.is_some() {
                        summary.imported += 1;
                    } else {
                        summary.skipped += 1;
                    }
                }
            }
        }
        self.core.emit(ChangeAction::Imported, None);
        Some(summary)
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
