// HBNB - Core Library
// Exposes all modules for use in the console, the web server, and tests

pub mod config;
pub mod console;
pub mod entities;
pub mod error;
pub mod logging;
pub mod storage;

#[cfg(feature = "server")]
pub mod web;

// Re-export commonly used types
pub use config::{StorageArgs, StorageConfig, StorageKind};
pub use console::Console;
pub use entities::{
    Amenity, Base, BaseModel, City, Entity, EntityKind, Model, Place, Review, State, User,
};
pub use error::{AttributeError, StorageError, StorageResult};
pub use storage::{open, DbStorage, FileStorage, Objects, Storage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
