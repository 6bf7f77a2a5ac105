//! Application entity contract.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// An application-defined record stored as one document per instance.
///
/// Entities are decoded from denormalized documents, so a struct may
/// declare an `id: String` field (the public identifier) and, if it needs
/// the raw store key, a field renamed from `_id`.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection the entity lives in by default.
    const COLLECTION: &'static str;
}
