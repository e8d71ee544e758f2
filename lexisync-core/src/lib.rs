//! Lexisync core library: entity model, local store, configuration and errors.
//!
//! Public API surface:
//! - [`types`]: ids and the course / level / word entities
//! - [`store`]: the [`Store`] capability and [`MemoryStore`]
//! - [`file_store`]: [`FileStore`], the YAML-backed store
//! - [`config`]: [`SyncConfig`]
//! - [`error`]: [`StoreError`]

pub mod config;
pub mod error;
pub mod file_store;
pub mod paths;
pub mod store;
pub mod types;

pub use config::{DeletePolicy, LevelKeying, SyncConfig};
pub use error::StoreError;
pub use file_store::FileStore;
pub use store::{MemoryStore, Store, Tables, WordFields};
pub use types::{
    CourseEntity, CourseId, DeleteMode, LevelEntity, LevelId, Tier, WordEntity, WordId,
};
