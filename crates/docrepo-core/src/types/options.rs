//! Per-operation option structs passed through to the store.

use serde::{Deserialize, Serialize};

use crate::types::sorting::SortSpec;

/// Options for `find` / `find_one`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindOptions {
    /// Sort applied before skip/limit.
    #[serde(default)]
    pub sort: Option<SortSpec>,
    /// Number of matching documents to skip.
    #[serde(default)]
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    #[serde(default)]
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Options with only a sort.
    pub fn sorted(sort: SortSpec) -> Self {
        Self {
            sort: Some(sort),
            ..Self::default()
        }
    }
}

/// Options for `find_one_and_update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindOneAndUpdateOptions {
    /// Picks which document is updated when several match.
    #[serde(default)]
    pub sort: Option<SortSpec>,
    /// Insert a document when nothing matches.
    pub upsert: bool,
    /// Return the post-update state instead of the pre-update state.
    pub return_new: bool,
}

impl Default for FindOneAndUpdateOptions {
    fn default() -> Self {
        Self {
            sort: None,
            upsert: true,
            return_new: true,
        }
    }
}

/// Options for `update_one` / `update_many`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Insert a document when nothing matches.
    #[serde(default)]
    pub upsert: bool,
}

/// Options for `delete_many`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Free-form comment attached to the operation for store-side profiling.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Options for `insert_many`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertManyOptions {
    /// Insert in the given order.
    pub ordered: bool,
}

impl Default for InsertManyOptions {
    fn default() -> Self {
        Self { ordered: true }
    }
}
