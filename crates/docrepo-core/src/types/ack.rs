//! Raw write acknowledgements returned by bulk mutation paths.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Acknowledgement of an update operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    /// Documents matched by the filter.
    pub matched_count: u64,
    /// Documents whose content actually changed.
    pub modified_count: u64,
    /// Key of the inserted document when the update upserted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<Value>,
}

/// Acknowledgement of a delete operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Documents removed.
    pub deleted_count: u64,
}
