//! Store handle contract.

use async_trait::async_trait;
use serde_json::Value;

use crate::result::AppResult;
use crate::types::ack::{DeleteResult, UpdateResult};
use crate::types::document::Document;
use crate::types::options::{
    DeleteOptions, FindOneAndUpdateOptions, FindOptions, InsertManyOptions, UpdateOptions,
};
use crate::types::projection::Projection;

/// An already-connected document store.
///
/// Every method issues exactly one request against the store and speaks the
/// store's native shapes: filters keyed by `_id`, operator update documents,
/// projection specs and pipeline stages. Filters are plain JSON values so
/// that primitive positional filters survive untouched; implementations
/// treat a non-object filter as a match on `_id`.
///
/// Failures are reported as [`AppError`](crate::error::AppError) values
/// that callers above this layer receive unchanged.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Transactional scope handle accepted by [`insert_one`](Self::insert_one).
    type Session: Send;

    /// Short backend name used in log fields.
    fn backend_name(&self) -> &'static str;

    /// Insert one document and return it as stored (with its `_id`).
    ///
    /// When a session is supplied the write joins that session's
    /// atomicity unit.
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut Self::Session>,
    ) -> AppResult<Document>;

    /// Insert several documents, all-or-nothing per store semantics.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        options: &InsertManyOptions,
    ) -> AppResult<Vec<Document>>;

    /// Find every matching document.
    async fn find(
        &self,
        collection: &str,
        filter: &Value,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>>;

    /// Find the first matching document.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Value,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> AppResult<Option<Document>> {
        let options = FindOptions {
            limit: Some(1),
            ..options.clone()
        };
        let documents = self.find(collection, filter, projection, &options).await?;
        Ok(documents.into_iter().next())
    }

    /// Atomically update one document and return its pre- or post-update state.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Value,
        update: &Document,
        projection: Option<&Projection>,
        options: &FindOneAndUpdateOptions,
    ) -> AppResult<Option<Document>>;

    /// Update the first matching document.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Value,
        update: &Document,
        options: &UpdateOptions,
    ) -> AppResult<UpdateResult>;

    /// Update every matching document.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Value,
        update: &Document,
        options: &UpdateOptions,
    ) -> AppResult<UpdateResult>;

    /// Delete the first matching document.
    async fn delete_one(&self, collection: &str, filter: &Value) -> AppResult<DeleteResult>;

    /// Delete every matching document.
    async fn delete_many(
        &self,
        collection: &str,
        filter: &Value,
        options: &DeleteOptions,
    ) -> AppResult<DeleteResult>;

    /// Count matching documents.
    async fn count_documents(&self, collection: &str, filter: &Value) -> AppResult<u64>;

    /// Run an aggregation pipeline, stages in the given order.
    async fn aggregate(&self, collection: &str, pipeline: &[Document]) -> AppResult<Vec<Document>>;
}
