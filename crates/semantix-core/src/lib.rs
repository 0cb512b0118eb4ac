pub mod bridge;
pub mod config;
pub mod constants;
pub mod error;
pub mod folders;
pub mod managers;
pub mod models;
pub mod runtime;
pub mod store;

pub use config::CoreConfig;
pub use error::BridgeError;
pub use runtime::SemantixRuntime;
