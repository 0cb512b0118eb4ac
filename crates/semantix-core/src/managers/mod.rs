pub mod entity;
pub mod events;
pub mod favorites;
pub mod projects;

pub use entity::{EntityRecord, OrganizedFolder, OrganizedStructure};
pub use events::{ActionCallback, ChangeAction, ChangeEvent, ChangeNotifier};
pub use favorites::{FavoritesManager, ImportMode, ImportSummary};
pub use projects::ProjectsManager;
