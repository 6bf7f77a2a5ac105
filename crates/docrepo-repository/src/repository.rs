//! Generic repository over a document store.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use docrepo_core::error::AppError;
use docrepo_core::result::AppResult;
use docrepo_core::traits::entity::Entity;
use docrepo_core::traits::repository::Repository;
use docrepo_core::traits::store::DocumentStore;
use docrepo_core::types::ack::{DeleteResult, UpdateResult};
use docrepo_core::types::document::{Document, ID_FIELD, KEY_FIELD};
use docrepo_core::types::options::{
    DeleteOptions, FindOneAndUpdateOptions, FindOptions, InsertManyOptions, UpdateOptions,
};
use docrepo_core::types::pagination::{ListOptions, Page};
use docrepo_core::types::projection::Projection;

use crate::normalize::{
    Outbound, into_update_document, normalized_filter, remove_undefined_values, to_document,
};
use crate::pagination::ListPlan;
use crate::populate::{PopulateOptions, populate_documents};

/// Typed repository for entities of type `T` stored in one collection.
///
/// The repository holds no entity state: it is a handle onto a shared store
/// plus a collection name, and every call issues its own store requests.
/// Every operation runs through the same dispatch path, which logs it and
/// denormalizes whatever entity data comes back. Query arguments are
/// normalized before dispatch.
pub struct BaseRepository<T, S> {
    store: Arc<S>,
    collection: String,
    entity: PhantomData<fn() -> T>,
}

impl<T, S> Clone for BaseRepository<T, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            collection: self.collection.clone(),
            entity: PhantomData,
        }
    }
}

impl<T, S> fmt::Debug for BaseRepository<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseRepository")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl<T, S> BaseRepository<T, S>
where
    T: Entity,
    S: DocumentStore,
{
    /// Repository over an explicit collection.
    pub fn new(store: Arc<S>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            entity: PhantomData,
        }
    }

    /// Repository over the entity's default collection.
    pub fn for_entity(store: Arc<S>) -> Self {
        Self::new(store, T::COLLECTION)
    }

    /// Collection this repository reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The shared store handle.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Insert a new entity.
    ///
    /// `id` and null-valued fields are dropped from the payload, so the
    /// store always assigns the key. With a session the insert joins that
    /// session's atomicity unit.
    pub async fn create<P>(&self, entity: &P, session: Option<&mut S::Session>) -> AppResult<T>
    where
        P: Serialize + ?Sized,
    {
        let mut document = to_document(entity)?;
        remove_undefined_values(&mut document);
        document.remove(ID_FIELD);

        let created = self
            .dispatch(
                "create",
                self.store.insert_one(&self.collection, document, session),
            )
            .await?;
        decode(created)
    }

    /// Apply a partial update to the entity with key `id`.
    ///
    /// Returns `true` iff a stored value changed and `false` when the
    /// document matched but was already up to date. Fails with a
    /// `NotFound` error when nothing matched.
    pub async fn update_by_id<P>(&self, id: &str, changes: &P) -> AppResult<bool>
    where
        P: Serialize + ?Sized,
    {
        let mut changes = to_document(changes)?;
        remove_undefined_values(&mut changes);
        let update = into_update_document(changes);
        let filter = json!({ KEY_FIELD: id });

        self.dispatch("update_by_id", async {
            let result = self
                .store
                .update_one(&self.collection, &filter, &update, &UpdateOptions::default())
                .await?;
            if result.matched_count == 0 {
                return Err(AppError::update_failed(id));
            }
            Ok(result.modified_count > 0)
        })
        .await
    }

    /// Delete the entity with key `id`. Fails with `NotFound` when absent.
    pub async fn delete_by_id(&self, id: &str) -> AppResult<bool> {
        let filter = json!({ KEY_FIELD: id });

        self.dispatch("delete_by_id", async {
            let result = self.store.delete_one(&self.collection, &filter).await?;
            if result.deleted_count == 0 {
                return Err(AppError::delete_failed(id));
            }
            Ok(true)
        })
        .await
    }

    /// Find the entity with key `id`.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<T>> {
        self.find_one(&json!({ ID_FIELD: id }), None, &FindOptions::default())
            .await
    }

    /// Find every entity matching `query`.
    pub async fn find(
        &self,
        query: &Value,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> AppResult<Vec<T>> {
        let filter = normalized_filter(query);
        let documents = self
            .dispatch(
                "find",
                self.store
                    .find(&self.collection, &filter, projection, options),
            )
            .await?;
        documents.into_iter().map(decode).collect()
    }

    /// Find the first entity matching `query`.
    pub async fn find_one(
        &self,
        query: &Value,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> AppResult<Option<T>> {
        let filter = normalized_filter(query);
        let document = self
            .dispatch(
                "find_one",
                self.store
                    .find_one(&self.collection, &filter, projection, options),
            )
            .await?;
        document.map(decode).transpose()
    }

    /// Update the first entity matching `query`, inserting one when nothing
    /// matches under the default options, and return its new state.
    pub async fn find_one_and_update<P>(
        &self,
        query: &Value,
        update: &P,
        options: &FindOneAndUpdateOptions,
    ) -> AppResult<Option<T>>
    where
        P: Serialize + ?Sized,
    {
        let filter = normalized_filter(query);
        let update = into_update_document(to_document(update)?);
        let document = self
            .dispatch(
                "find_one_and_update",
                self.store
                    .find_one_and_update(&self.collection, &filter, &update, None, options),
            )
            .await?;
        document.map(decode).transpose()
    }

    /// List one page of entities matching `query`.
    pub async fn find_all(&self, query: &Value, options: &ListOptions) -> AppResult<Page<T>> {
        self.find_all_documents(query, options).await?.try_map(decode)
    }

    /// List one page of raw documents matching `query`.
    ///
    /// Useful with a field selection that leaves out fields `T` requires.
    pub async fn find_all_documents(
        &self,
        query: &Value,
        options: &ListOptions,
    ) -> AppResult<Page<Document>> {
        let plan = ListPlan::resolve(options)?;
        let filter = normalized_filter(query);

        self.dispatch("find_all", async {
            let total = self.store.count_documents(&self.collection, &filter).await?;
            let data = self
                .store
                .find(
                    &self.collection,
                    &filter,
                    plan.projection.as_ref(),
                    &plan.find_options(),
                )
                .await?;
            Ok(plan.into_page(data, total))
        })
        .await
    }

    /// Update the first document matching `filter`; returns the raw
    /// acknowledgement.
    pub async fn update_one<P>(
        &self,
        filter: &Value,
        update: &P,
        options: &UpdateOptions,
    ) -> AppResult<UpdateResult>
    where
        P: Serialize + ?Sized,
    {
        let filter = normalized_filter(filter);
        let update = into_update_document(to_document(update)?);
        self.dispatch(
            "update_one",
            self.store
                .update_one(&self.collection, &filter, &update, options),
        )
        .await
    }

    /// Update every document matching `filter`; returns the raw
    /// acknowledgement.
    pub async fn update_many<P>(
        &self,
        filter: &Value,
        update: &P,
        options: &UpdateOptions,
    ) -> AppResult<UpdateResult>
    where
        P: Serialize + ?Sized,
    {
        let filter = normalized_filter(filter);
        let update = into_update_document(to_document(update)?);
        self.dispatch(
            "update_many",
            self.store
                .update_many(&self.collection, &filter, &update, options),
        )
        .await
    }

    /// Delete every document matching `filter`.
    pub async fn delete_many(
        &self,
        filter: &Value,
        options: &DeleteOptions,
    ) -> AppResult<DeleteResult> {
        let filter = normalized_filter(filter);
        self.dispatch(
            "delete_many",
            self.store.delete_many(&self.collection, &filter, options),
        )
        .await
    }

    /// Run an aggregation pipeline, stages in the given order.
    pub async fn aggregate(&self, pipeline: &[Document]) -> AppResult<Vec<Document>> {
        self.dispatch(
            "aggregate",
            self.store.aggregate(&self.collection, pipeline),
        )
        .await
    }

    /// Resolve reference fields on an entity or an array of entities.
    ///
    /// The output has the same shape as the input. Values that are neither
    /// documents nor arrays come back unchanged.
    pub async fn populate(&self, mut documents: Value, options: &[PopulateOptions]) -> AppResult<Value> {
        self.dispatch("populate", async {
            {
                let mut targets: Vec<&mut Document> = match &mut documents {
                    Value::Array(items) => items.iter_mut().filter_map(Value::as_object_mut).collect(),
                    Value::Object(document) => vec![document],
                    _ => Vec::new(),
                };
                for option in options {
                    populate_documents(self.store.as_ref(), &mut targets, option).await?;
                }
            }
            Ok(documents)
        })
        .await
    }

    /// Find documents matching `query` and resolve their reference fields.
    pub async fn find_and_populate(
        &self,
        query: &Value,
        options: &[PopulateOptions],
        projection: Option<&Projection>,
    ) -> AppResult<Vec<Document>> {
        let filter = normalized_filter(query);

        self.dispatch("find_and_populate", async {
            let mut documents = self
                .store
                .find(&self.collection, &filter, projection, &FindOptions::default())
                .await?;
            {
                let mut targets: Vec<&mut Document> = documents.iter_mut().collect();
                for option in options {
                    populate_documents(self.store.as_ref(), &mut targets, option).await?;
                }
            }
            Ok(documents)
        })
        .await
    }

    /// Insert several entities at once, all-or-nothing per store semantics.
    pub async fn insert_many<P>(&self, entities: &[P], options: &InsertManyOptions) -> AppResult<Vec<T>>
    where
        P: Serialize,
    {
        let mut documents = Vec::with_capacity(entities.len());
        for entity in entities {
            let mut document = to_document(entity)?;
            remove_undefined_values(&mut document);
            document.remove(ID_FIELD);
            documents.push(document);
        }

        let created = self
            .dispatch(
                "insert_many",
                self.store.insert_many(&self.collection, documents, options),
            )
            .await?;
        created.into_iter().map(decode).collect()
    }

    /// Count entities matching `query`.
    pub async fn count(&self, query: &Value) -> AppResult<u64> {
        let filter = normalized_filter(query);
        self.dispatch(
            "count",
            self.store.count_documents(&self.collection, &filter),
        )
        .await
    }

    /// Await one store request and denormalize its result.
    async fn dispatch<R, F>(&self, operation: &'static str, request: F) -> AppResult<R>
    where
        R: Outbound,
        F: Future<Output = AppResult<R>>,
    {
        debug!(
            collection = %self.collection,
            operation,
            backend = self.store.backend_name(),
            "Repository operation"
        );
        let mut result = request.await.inspect_err(|e| {
            debug!(collection = %self.collection, operation, error = %e, "Repository operation failed");
        })?;
        result.denormalize();
        Ok(result)
    }
}

#[async_trait]
impl<T, S> Repository<T> for BaseRepository<T, S>
where
    T: Entity,
    S: DocumentStore,
{
    type Session = S::Session;

    async fn create<P>(&self, entity: &P, session: Option<&mut S::Session>) -> AppResult<T>
    where
        P: Serialize + Sync + ?Sized,
    {
        BaseRepository::create(self, entity, session).await
    }

    async fn update_by_id<P>(&self, id: &str, changes: &P) -> AppResult<bool>
    where
        P: Serialize + Sync + ?Sized,
    {
        BaseRepository::update_by_id(self, id, changes).await
    }

    async fn delete_by_id(&self, id: &str) -> AppResult<bool> {
        BaseRepository::delete_by_id(self, id).await
    }

    async fn find_one(&self, query: &Value) -> AppResult<Option<T>> {
        BaseRepository::find_one(self, query, None, &FindOptions::default()).await
    }

    async fn find_all(&self, query: &Value, options: &ListOptions) -> AppResult<Page<T>> {
        BaseRepository::find_all(self, query, options).await
    }

    async fn count(&self, query: &Value) -> AppResult<u64> {
        BaseRepository::count(self, query).await
    }
}

fn decode<T: Entity>(document: Document) -> AppResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}
