use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_PROJECT_COLOR, DEFAULT_PROJECT_ICON};

use super::now_ms;

/// A user-defined project.
///
/// `id` and `created_at` are immutable after creation; `updated_at` is
/// refreshed on every successful update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub folder_id: Option<String>,
}

/// Input for `ProjectsManager::add`. `name` must be non-empty after
/// trimming. Folder placement semantics match [`super::NewFavorite`].
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub folder_id: Option<Option<String>>,
    pub use_selected_folder: bool,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            color: None,
            icon: None,
            folder_id: None,
            use_selected_folder: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn in_folder(mut self, folder_id: Option<String>) -> Self {
        self.folder_id = Some(folder_id);
        self
    }

    /// Materialize the project record, defaulting color/icon and stamping
    /// timestamps. `folder_id` is resolved separately by the manager.
    pub(crate) fn into_item(self, folder_id: Option<String>) -> ProjectItem {
        let now = now_ms();
        ProjectItem {
            id: Uuid::new_v4().to_string(),
            name: self.name.trim().to_string(),
            description: self.description,
            color: self.color.unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string()),
            icon: self.icon.unwrap_or_else(|| DEFAULT_PROJECT_ICON.to_string()),
            created_at: now,
            updated_at: now,
            folder_id,
        }
    }
}

/// Partial update for a project. `id` and `created_at` are not
/// representable; `updated_at` is stamped by the manager, not the caller.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Option<String>>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.icon.is_none()
            && self.folder_id.is_none()
    }
}
