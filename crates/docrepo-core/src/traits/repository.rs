//! Generic repository contract.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::result::AppResult;
use crate::traits::entity::Entity;
use crate::types::pagination::{ListOptions, Page};

/// Entity-level CRUD contract for one entity type.
///
/// Callers address entities by their public `id`; implementations rewrite
/// it to the store's key on the way in and expose both on the way out.
/// Store-native operations (bulk updates, aggregation, population) are
/// defined on the concrete repository types.
#[async_trait]
pub trait Repository<T>: Send + Sync + 'static
where
    T: Entity,
{
    /// Transactional scope handle accepted by [`create`](Self::create).
    type Session: Send;

    /// Insert a new entity. Any `id` in the payload is ignored.
    async fn create<P>(&self, entity: &P, session: Option<&mut Self::Session>) -> AppResult<T>
    where
        P: Serialize + Sync + ?Sized;

    /// Apply a partial update. Returns `true` only when a value changed.
    async fn update_by_id<P>(&self, id: &str, changes: &P) -> AppResult<bool>
    where
        P: Serialize + Sync + ?Sized;

    /// Delete an entity by its public identifier.
    async fn delete_by_id(&self, id: &str) -> AppResult<bool>;

    /// Find the first entity matching `query`.
    async fn find_one(&self, query: &Value) -> AppResult<Option<T>>;

    /// List entities matching `query` one page at a time.
    async fn find_all(&self, query: &Value, options: &ListOptions) -> AppResult<Page<T>>;

    /// Count entities matching `query`.
    async fn count(&self, query: &Value) -> AppResult<u64>;
}
