//! Application-wide constants
//!
//! Centralized location for magic strings and configuration values
//! that are used across multiple modules.

/// Source tag on every request posted by the page-side client
pub const SOURCE_PAGE: &str = "semantix-storage";

/// Source tag on every response/update posted by the privileged host
pub const SOURCE_RESPONSE: &str = "semantix-storage-response";

/// Per-request bridge timeout in milliseconds
pub const REQUEST_TIMEOUT_MS: u64 = 5000;

/// TTL of the entity managers' full-list cache in milliseconds.
/// Invalidated eagerly on local mutations; remote mutations are only
/// picked up once this expires (see the staleness note in the managers).
pub const LIST_CACHE_TTL_MS: u64 = 5000;

// Entity limits
pub const MAX_FAVORITES: usize = 100;
pub const MAX_PROJECTS: usize = 50;

// Folder limits
pub const MAX_FOLDERS_PER_SECTION: usize = 30;
/// Maximum folder depth: root (0), child (1), grandchild (2)
pub const MAX_FOLDER_DEPTH: usize = 2;

// Project defaults
pub const DEFAULT_PROJECT_COLOR: &str = "#6b7280";
pub const DEFAULT_PROJECT_ICON: &str = "folder";

// Folder defaults
pub const DEFAULT_FOLDER_COLOR: &str = "#8b5cf6";
pub const DEFAULT_FOLDER_ICON: &str = "folder";
