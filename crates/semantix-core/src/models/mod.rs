pub mod favorite;
pub mod folder;
pub mod project;
pub mod section;

pub use favorite::{FavoriteItem, FavoritePatch, NewFavorite, Provider};
pub use folder::{Folder, FolderTreeNode};
pub use project::{NewProject, ProjectItem, ProjectPatch};
pub use section::Section;

/// Current Unix timestamp in milliseconds
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
