//! Integration tests for create, update and delete paths.

mod helpers;

use serde_json::json;

use docrepo::prelude::*;
use helpers::UserInput;

#[tokio::test]
async fn test_create_assigns_store_key() {
    let app = helpers::TestApp::new();

    let input = UserInput {
        id: Some("chosen-by-caller".into()),
        name: Some("Ann".into()),
        email: Some("ann@example.com".into()),
        age: None,
    };
    let user = app.users.create(&input, None).await.unwrap();

    assert_ne!(user.id, "chosen-by-caller");
    assert_eq!(user.id.len(), 24);
    assert_eq!(user.name, "Ann");

    let stored = app.users.find_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored, user);
    assert_eq!(
        app.users
            .count(&json!({"id": "chosen-by-caller"}))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_update_by_id_strips_identifier() {
    let app = helpers::TestApp::new();
    app.seed("users", json!({"_id": "abc123", "name": "Ann", "age": 30}))
        .await;

    let changes = json!({"name": "x", "id": "zzz"});
    assert!(app.users.update_by_id("abc123", &changes).await.unwrap());

    let user = app.users.find_by_id("abc123").await.unwrap().unwrap();
    assert_eq!(user.name, "x");
    assert_eq!(user.age, Some(30));
    assert!(app.users.find_by_id("zzz").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_by_id_unchanged_is_false() {
    let app = helpers::TestApp::new();
    app.seed("users", json!({"_id": "abc123", "name": "x"})).await;

    let changes = UserInput {
        name: Some("x".into()),
        ..UserInput::default()
    };
    assert!(!app.users.update_by_id("abc123", &changes).await.unwrap());
}

#[tokio::test]
async fn test_update_by_id_missing_fails() {
    let app = helpers::TestApp::new();

    let err = app
        .users
        .update_by_id("abc123", &json!({"name": "x"}))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(err.message.contains("abc123"));
}

#[tokio::test]
async fn test_delete_by_id() {
    let app = helpers::TestApp::new();
    app.seed("users", json!({"_id": "abc123", "name": "Ann"})).await;

    assert!(app.users.delete_by_id("abc123").await.unwrap());

    let err = app.users.delete_by_id("abc123").await.unwrap_err();
    assert!(err.is_not_found());
    let err = app.users.delete_by_id("never-existed").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_bulk_updates_and_deletes() {
    let app = helpers::TestApp::new();
    app.seed_users(10).await;

    let ack = app
        .users
        .update_many(
            &json!({"age": {"$lt": 23}}),
            &json!({"$set": {"junior": true}, "$inc": {"age": 1}}),
            &UpdateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(ack.matched_count, 3);
    assert_eq!(ack.modified_count, 3);
    assert!(ack.upserted_id.is_none());

    let ack = app
        .users
        .update_one(
            &json!({"id": "missing"}),
            &json!({"name": "Ghost"}),
            &UpdateOptions { upsert: true },
        )
        .await
        .unwrap();
    assert_eq!(ack.upserted_id, Some(json!("missing")));

    let ack = app
        .users
        .delete_many(&json!({"junior": true}), &DeleteOptions::default())
        .await
        .unwrap();
    assert_eq!(ack.deleted_count, 3);
    assert_eq!(app.users.count(&json!({})).await.unwrap(), 8);
}

#[tokio::test]
async fn test_bulk_updates_strip_identifier() {
    let app = helpers::TestApp::new();
    app.seed_users(3).await;

    let ack = app
        .users
        .update_many(&json!({}), &json!({"id": "zzz", "name": "x"}), &UpdateOptions::default())
        .await
        .unwrap();
    assert_eq!((ack.matched_count, ack.modified_count), (3, 3));

    let ack = app
        .users
        .update_one(
            &json!({"id": "user-001"}),
            &json!({"$set": {"id": "zzz", "age": 99}}),
            &UpdateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(ack.modified_count, 1);

    let stored = app
        .store
        .find("users", &json!({}), None, &FindOptions::default())
        .await
        .unwrap();
    assert_eq!(stored.len(), 3);
    for document in &stored {
        assert!(!document.contains_key("id"), "{document:?}");
        assert_eq!(document["name"], json!("x"));
    }
    assert!(app.users.find_by_id("user-001").await.unwrap().is_some());
    assert_eq!(app.users.count(&json!({"id": "zzz"})).await.unwrap(), 0);
}

#[tokio::test]
async fn test_find_one_and_update_upserts() {
    let app = helpers::TestApp::new();

    let user = app
        .users
        .find_one_and_update(
            &json!({"email": "dee@example.com"}),
            &json!({"name": "Dee", "id": "ignored"}),
            &FindOneAndUpdateOptions::default(),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(user.email.as_deref(), Some("dee@example.com"));
    assert_ne!(user.id, "ignored");
    assert_eq!(app.users.count(&json!({})).await.unwrap(), 1);
}

#[tokio::test]
async fn test_insert_many_is_all_or_nothing() {
    let app = helpers::TestApp::new();
    app.seed("users", json!({"_id": "taken", "name": "Ann"})).await;

    let created = app
        .users
        .insert_many(
            &[json!({"name": "Bob"}), json!({"name": "Cid", "id": "x"})],
            &InsertManyOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|u| u.id != "x"));

    let err = app
        .users
        .insert_many(
            &[json!({"_id": "fresh", "name": "Dee"}), json!({"_id": "taken", "name": "Eve"})],
            &InsertManyOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(app.users.count(&json!({})).await.unwrap(), 3);
}
