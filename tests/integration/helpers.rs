//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use docrepo::prelude::*;

/// Entity used across the integration suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
}

impl Entity for User {
    const COLLECTION: &'static str = "users";
}

/// Partial user payload, as an application would send for create/update.
#[derive(Debug, Default, Serialize)]
pub struct UserInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
}

/// Test application context
pub struct TestApp {
    /// Store shared by every repository in the test
    pub store: Arc<MemoryStore>,
    /// Repository under test
    pub users: BaseRepository<User, MemoryStore>,
}

impl TestApp {
    /// Create an application over an empty in-memory store
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let users = BaseRepository::for_entity(Arc::clone(&store));
        Self { store, users }
    }

    /// Repository over another collection of the same store
    pub fn repository<T: Entity>(&self, collection: &str) -> BaseRepository<T, MemoryStore> {
        BaseRepository::new(Arc::clone(&self.store), collection)
    }

    /// Store a raw document with an explicit `_id`
    pub async fn seed(&self, collection: &str, document: Value) {
        let document = document
            .as_object()
            .cloned()
            .expect("seed documents must be objects");
        self.store
            .insert_one(collection, document, None)
            .await
            .expect("Failed to seed document");
    }

    /// Seed `count` users keyed `user-000`, `user-001`, ... in reverse order
    pub async fn seed_users(&self, count: usize) {
        for n in (0..count).rev() {
            self.seed(
                "users",
                json!({
                    "_id": format!("user-{n:03}"),
                    "name": format!("User {n}"),
                    "age": 20 + (n % 40) as u32,
                }),
            )
            .await;
        }
    }
}
