pub mod facade;
pub mod keys;
pub mod list_ops;

pub use facade::SemantixStorage;
pub use keys::StorageKey;
pub use list_ops::ListOptions;
