//! MongoDB-backed document store.
//!
//! Documents cross this boundary as JSON. `_id` strings that parse as an
//! ObjectId are cast to one on the way in, and ObjectIds are surfaced as
//! their 24-character hex form on the way out.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Bson, Document as BsonDocument};
use mongodb::error::{Error as MongoError, ErrorKind as MongoErrorKind, WriteFailure};
use mongodb::options::{self as mongo_options, ReturnDocument};
use mongodb::{ClientSession, Collection, Database};
use serde_json::Value;
use tracing::trace;

use docrepo_core::config::DatabaseConfig;
use docrepo_core::error::{AppError, ErrorKind};
use docrepo_core::result::AppResult;
use docrepo_core::traits::store::DocumentStore;
use docrepo_core::types::ack::{DeleteResult, UpdateResult};
use docrepo_core::types::document::{Document, KEY_FIELD};
use docrepo_core::types::options::{
    DeleteOptions, FindOneAndUpdateOptions, FindOptions, InsertManyOptions, UpdateOptions,
};
use docrepo_core::types::projection::Projection;
use docrepo_core::types::sorting::SortSpec;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Document store handle over a MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Wrap an already-connected database.
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Connect using `config` and verify the deployment is reachable.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let database = crate::connection::connect(config).await?;
        Ok(Self::new(database))
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Start a client session.
    ///
    /// Call `start_transaction` on it before handing it to `insert_one`
    /// to make the write part of a multi-document transaction.
    pub async fn start_session(&self) -> AppResult<ClientSession> {
        self.database
            .client()
            .start_session()
            .await
            .map_err(|e| store_error("start_session", e))
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection::<BsonDocument>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    type Session = ClientSession;

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut ClientSession>,
    ) -> AppResult<Document> {
        let mut document = to_stored_document(&document)?;
        trace!(collection, staged = session.is_some(), "insert_one");

        let coll = self.collection(collection);
        let result = match session {
            Some(session) => coll.insert_one(&document).session(session).await,
            None => coll.insert_one(&document).await,
        };
        let inserted = result.map_err(|e| store_error("insert_one", e))?;
        document.insert(KEY_FIELD, inserted.inserted_id);
        Ok(from_bson_document(document))
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        options: &InsertManyOptions,
    ) -> AppResult<Vec<Document>> {
        trace!(collection, count = documents.len(), ordered = options.ordered, "insert_many");
        let documents = documents
            .iter()
            .map(to_stored_document)
            .collect::<AppResult<Vec<_>>>()?;

        let mut insert_options = mongo_options::InsertManyOptions::default();
        insert_options.ordered = Some(options.ordered);
        self.collection(collection)
            .insert_many(&documents)
            .with_options(insert_options)
            .await
            .map_err(|e| store_error("insert_many", e))?;

        Ok(documents.into_iter().map(from_bson_document).collect())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Value,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>> {
        trace!(collection, "find");
        let mut find_options = mongo_options::FindOptions::default();
        find_options.projection = projection.map(projection_document).transpose()?;
        find_options.sort = options.sort.as_ref().map(sort_document);
        find_options.skip = options.skip;
        find_options.limit = options.limit.map(|l| l as i64);

        let cursor = self
            .collection(collection)
            .find(filter_document(filter)?)
            .with_options(find_options)
            .await
            .map_err(|e| store_error("find", e))?;
        let documents: Vec<BsonDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| store_error("find", e))?;

        Ok(documents.into_iter().map(from_bson_document).collect())
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Value,
        update: &Document,
        projection: Option<&Projection>,
        options: &FindOneAndUpdateOptions,
    ) -> AppResult<Option<Document>> {
        trace!(collection, upsert = options.upsert, "find_one_and_update");
        let mut update_options = mongo_options::FindOneAndUpdateOptions::default();
        update_options.sort = options.sort.as_ref().map(sort_document);
        update_options.upsert = Some(options.upsert);
        update_options.projection = projection.map(projection_document).transpose()?;
        update_options.return_document = Some(if options.return_new {
            ReturnDocument::After
        } else {
            ReturnDocument::Before
        });

        let found = self
            .collection(collection)
            .find_one_and_update(filter_document(filter)?, plain_document(update)?)
            .with_options(update_options)
            .await
            .map_err(|e| store_error("find_one_and_update", e))?;

        Ok(found.map(from_bson_document))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Value,
        update: &Document,
        options: &UpdateOptions,
    ) -> AppResult<UpdateResult> {
        trace!(collection, "update_one");
        let mut update_options = mongo_options::UpdateOptions::default();
        update_options.upsert = Some(options.upsert);

        let result = self
            .collection(collection)
            .update_one(filter_document(filter)?, plain_document(update)?)
            .with_options(update_options)
            .await
            .map_err(|e| store_error("update_one", e))?;

        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id.map(bson_to_json),
        })
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Value,
        update: &Document,
        options: &UpdateOptions,
    ) -> AppResult<UpdateResult> {
        trace!(collection, "update_many");
        let mut update_options = mongo_options::UpdateOptions::default();
        update_options.upsert = Some(options.upsert);

        let result = self
            .collection(collection)
            .update_many(filter_document(filter)?, plain_document(update)?)
            .with_options(update_options)
            .await
            .map_err(|e| store_error("update_many", e))?;

        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id.map(bson_to_json),
        })
    }

    async fn delete_one(&self, collection: &str, filter: &Value) -> AppResult<DeleteResult> {
        trace!(collection, "delete_one");
        let result = self
            .collection(collection)
            .delete_one(filter_document(filter)?)
            .await
            .map_err(|e| store_error("delete_one", e))?;

        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Value,
        options: &DeleteOptions,
    ) -> AppResult<DeleteResult> {
        trace!(collection, comment = options.comment.as_deref(), "delete_many");
        let mut delete_options = mongo_options::DeleteOptions::default();
        delete_options.comment = options.comment.clone().map(Bson::String);

        let result = self
            .collection(collection)
            .delete_many(filter_document(filter)?)
            .with_options(delete_options)
            .await
            .map_err(|e| store_error("delete_many", e))?;

        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    async fn count_documents(&self, collection: &str, filter: &Value) -> AppResult<u64> {
        self.collection(collection)
            .count_documents(filter_document(filter)?)
            .await
            .map_err(|e| store_error("count_documents", e))
    }

    async fn aggregate(&self, collection: &str, pipeline: &[Document]) -> AppResult<Vec<Document>> {
        trace!(collection, stages = pipeline.len(), "aggregate");
        let mut stages = Vec::with_capacity(pipeline.len());
        for stage in pipeline {
            let mut stage = plain_document(stage)?;
            if let Ok(matcher) = stage.get_document_mut("$match") {
                cast_keys(matcher);
            }
            stages.push(stage);
        }

        let cursor = self
            .collection(collection)
            .aggregate(stages)
            .await
            .map_err(|e| store_error("aggregate", e))?;
        let documents: Vec<BsonDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| store_error("aggregate", e))?;

        Ok(documents.into_iter().map(from_bson_document).collect())
    }
}

/// Map a driver error, surfacing duplicate-key violations as conflicts.
fn store_error(operation: &str, err: MongoError) -> AppError {
    let duplicate = matches!(
        err.kind.as_ref(),
        MongoErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY_CODE
    ) || err.to_string().contains("E11000");
    let kind = if duplicate {
        ErrorKind::Conflict
    } else {
        ErrorKind::Database
    };
    AppError::with_source(kind, format!("MongoDB {operation} failed: {err}"), err)
}

fn serialization_error(err: bson::ser::Error) -> AppError {
    AppError::with_source(
        ErrorKind::Serialization,
        format!("Failed to convert document to BSON: {err}"),
        err,
    )
}

fn plain_document(document: &Document) -> AppResult<BsonDocument> {
    bson::to_document(document).map_err(serialization_error)
}

/// Filter as BSON. A non-object filter is a match on `_id`.
fn filter_document(filter: &Value) -> AppResult<BsonDocument> {
    let mut document = match filter {
        Value::Null => BsonDocument::new(),
        Value::Object(map) => plain_document(map)?,
        key => {
            let mut document = BsonDocument::new();
            document.insert(KEY_FIELD, bson::to_bson(key).map_err(serialization_error)?);
            document
        }
    };
    cast_keys(&mut document);
    Ok(document)
}

/// Document ready to insert, with an ObjectId assigned when `_id` is absent.
fn to_stored_document(document: &Document) -> AppResult<BsonDocument> {
    let mut stored = plain_document(document)?;
    match stored.get(KEY_FIELD) {
        None | Some(Bson::Null) => {
            stored.insert(KEY_FIELD, ObjectId::new());
        }
        Some(_) => cast_keys(&mut stored),
    }
    Ok(stored)
}

fn projection_document(projection: &Projection) -> AppResult<BsonDocument> {
    plain_document(&projection.to_document())
}

fn sort_document(sort: &SortSpec) -> BsonDocument {
    let mut document = BsonDocument::new();
    for field in sort.fields() {
        document.insert(field.field.clone(), field.direction.as_i32());
    }
    document
}

/// Cast `_id` values, including those under `$and`/`$or`/`$nor`.
fn cast_keys(document: &mut BsonDocument) {
    for (key, value) in document.iter_mut() {
        match key.as_str() {
            KEY_FIELD => cast_key_value(value),
            "$and" | "$or" | "$nor" => {
                if let Bson::Array(clauses) = value {
                    for clause in clauses {
                        if let Bson::Document(clause) = clause {
                            cast_keys(clause);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn cast_key_value(value: &mut Bson) {
    match value {
        Bson::String(hex) => {
            if let Ok(oid) = ObjectId::parse_str(hex.as_str()) {
                *value = Bson::ObjectId(oid);
            }
        }
        Bson::Array(items) => items.iter_mut().for_each(cast_key_value),
        Bson::Document(operators) => {
            for (_, argument) in operators.iter_mut() {
                cast_key_value(argument);
            }
        }
        _ => {}
    }
}

fn from_bson_document(document: BsonDocument) -> Document {
    match bson_to_json(Bson::Document(document)) {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn bson_to_json(value: Bson) -> Value {
    unwrap_object_ids(value.into_relaxed_extjson())
}

/// Replace `{"$oid": "<hex>"}` wrappers with the bare hex string.
fn unwrap_object_ids(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(hex)) = map.get("$oid") {
                    return Value::String(hex.clone());
                }
            }
            Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, unwrap_object_ids(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_object_ids).collect()),
        other => other,
    }
}
