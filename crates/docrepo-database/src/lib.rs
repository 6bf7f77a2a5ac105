//! # docrepo-database
//!
//! Store handles for DocRepo: an in-process [`MemoryStore`] and, with the
//! `mongodb` feature, a MongoDB-backed [`MongoStore`], plus connection
//! bootstrapping.

pub mod connection;
pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;

pub use memory::{MemorySession, MemoryStore};
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;
