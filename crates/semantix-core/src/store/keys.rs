//! The closed set of keys the store knows about.
//!
//! Keys are an enum rather than free-form strings so the cache, the
//! schema defaults, and the change-listener registry all agree on what
//! can exist. The wire carries the string form.

use serde_json::{json, Value};

use crate::models::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Flat array of favorite items, newest first
    Favorites,
    /// Flat array of project items, newest first
    Projects,
    /// One shared map of `section name -> selected folder id | null`
    SelectedFolders,
    /// Per-section flat array of folder records
    Folders(Section),
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Favorites => "semantix_favorites",
            StorageKey::Projects => "semantix_projects",
            StorageKey::SelectedFolders => "semantix_selected_folders",
            StorageKey::Folders(Section::Favorites) => "semantix_favorites_folders",
            StorageKey::Folders(Section::Projects) => "semantix_projects_folders",
            StorageKey::Folders(Section::Memories) => "semantix_memories_folders",
            StorageKey::Folders(Section::Prompts) => "semantix_prompts_folders",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "semantix_favorites" => Some(StorageKey::Favorites),
            "semantix_projects" => Some(StorageKey::Projects),
            "semantix_selected_folders" => Some(StorageKey::SelectedFolders),
            "semantix_favorites_folders" => Some(StorageKey::Folders(Section::Favorites)),
            "semantix_projects_folders" => Some(StorageKey::Folders(Section::Projects)),
            "semantix_memories_folders" => Some(StorageKey::Folders(Section::Memories)),
            "semantix_prompts_folders" => Some(StorageKey::Folders(Section::Prompts)),
            _ => None,
        }
    }

    /// Schema-level default substituted when the host has no value (or the
    /// bridge failed). List keys default to an empty array, the selected
    /// folder map to an empty object.
    pub fn schema_default(&self) -> Value {
        match self {
            StorageKey::SelectedFolders => json!({}),
            _ => json!([]),
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_round_trip() {
        let keys = [
            StorageKey::Favorites,
            StorageKey::Projects,
            StorageKey::SelectedFolders,
            StorageKey::Folders(Section::Favorites),
            StorageKey::Folders(Section::Prompts),
        ];
        for key in keys {
            assert_eq!(StorageKey::from_wire(key.as_str()), Some(key));
        }
        assert_eq!(StorageKey::from_wire("unknown_key"), None);
    }

    #[test]
    fn test_schema_defaults() {
        assert_eq!(StorageKey::Favorites.schema_default(), json!([]));
        assert_eq!(StorageKey::SelectedFolders.schema_default(), json!({}));
    }
}
