//! # DocRepo
//!
//! A typed repository layer over document stores. Application code talks to
//! a [`BaseRepository`] in terms of its public `id` field; the repository
//! rewrites queries to the store's `_id` key, exposes both on every read,
//! and bounds list requests into page envelopes.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use docrepo::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Note {
//!     id: String,
//!     title: String,
//! }
//!
//! impl Entity for Note {
//!     const COLLECTION: &'static str = "notes";
//! }
//!
//! # async fn run() -> AppResult<()> {
//! let notes = BaseRepository::<Note, _>::for_entity(Arc::new(MemoryStore::new()));
//! let note = notes.create(&serde_json::json!({"title": "hello"}), None).await?;
//! let page = notes.find_all(&serde_json::json!({}), &ListOptions::default()).await?;
//! assert_eq!(page.data[0].id, note.id);
//! # Ok(())
//! # }
//! ```

pub mod telemetry;

pub use docrepo_core as core;
pub use docrepo_database as database;
pub use docrepo_repository as repository;

/// The types most callers need.
pub mod prelude {
    pub use docrepo_core::config::{AppConfig, DatabaseConfig, LoggingConfig};
    pub use docrepo_core::error::{AppError, ErrorKind};
    pub use docrepo_core::result::AppResult;
    pub use docrepo_core::traits::{DocumentStore, Entity, Repository};
    pub use docrepo_core::types::{
        DeleteOptions, DeleteResult, Document, FindOneAndUpdateOptions, FindOptions,
        InsertManyOptions, ListOptions, Page, Projection, SortSpec, UpdateOptions, UpdateResult,
    };
    pub use docrepo_database::{MemorySession, MemoryStore};
    #[cfg(feature = "mongodb")]
    pub use docrepo_database::MongoStore;
    pub use docrepo_repository::{BaseRepository, PopulateOptions};
}
