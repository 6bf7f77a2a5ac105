//! Core type definitions used across the DocRepo workspace.

pub mod ack;
pub mod document;
pub mod object_id;
pub mod options;
pub mod pagination;
pub mod projection;
pub mod sorting;

pub use ack::{DeleteResult, UpdateResult};
pub use document::{Document, ID_FIELD, KEY_FIELD};
pub use object_id::{is_object_id, new_object_id};
pub use options::{
    DeleteOptions, FindOneAndUpdateOptions, FindOptions, InsertManyOptions, UpdateOptions,
};
pub use pagination::{ListOptions, Page};
pub use projection::{Projection, ProjectionMode};
pub use sorting::{SortDirection, SortField, SortSpec};
