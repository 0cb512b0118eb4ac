use serde::{Deserialize, Serialize};

/// A folder record. Forms a tree via `parent_id`; depth is capped at
/// grandchildren by the folders manager, not by this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub color: String,
    pub icon: String,
    /// Position among siblings
    pub order: u32,
    #[serde(default)]
    pub collapsed: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A folder with its resolved children, as produced by
/// `SectionFoldersManager::get_tree`.
#[derive(Debug, Clone, Serialize)]
pub struct FolderTreeNode {
    #[serde(flatten)]
    pub folder: Folder,
    pub children: Vec<FolderTreeNode>,
}
