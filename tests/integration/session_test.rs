//! Integration tests for create inside a transactional scope.

mod helpers;

use serde_json::json;

use docrepo::prelude::*;
use helpers::UserInput;

fn input(name: &str) -> UserInput {
    UserInput {
        name: Some(name.into()),
        ..UserInput::default()
    }
}

#[tokio::test]
async fn test_commit_publishes_grouped_creates() {
    let app = helpers::TestApp::new();
    let audit = app.repository::<helpers::User>("audit");
    let mut session = app.store.start_session();

    let user = app.users.create(&input("Ann"), Some(&mut session)).await.unwrap();
    audit
        .create(&json!({"name": "signup"}), Some(&mut session))
        .await
        .unwrap();

    assert_eq!(user.name, "Ann");
    assert_eq!(session.pending(), 2);
    assert!(app.users.find_by_id(&user.id).await.unwrap().is_none());

    session.commit_transaction().await.unwrap();

    assert!(app.users.find_by_id(&user.id).await.unwrap().is_some());
    assert_eq!(audit.count(&json!({})).await.unwrap(), 1);
}

#[tokio::test]
async fn test_abort_discards_creates() {
    let app = helpers::TestApp::new();
    let mut session = app.store.start_session();

    app.users.create(&input("Ann"), Some(&mut session)).await.unwrap();
    app.users.create(&input("Bob"), None).await.unwrap();
    session.abort_transaction().await.unwrap();

    let page = app
        .users
        .find_all(&json!({}), &ListOptions::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].name, "Bob");
}

#[tokio::test]
async fn test_finished_session_rejects_writes() {
    let app = helpers::TestApp::new();
    let mut session = app.store.start_session();
    session.commit_transaction().await.unwrap();

    let err = app
        .users
        .create(&input("Late"), Some(&mut session))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transaction);
    assert_eq!(app.users.count(&json!({})).await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_creates_do_not_interfere() {
    let app = helpers::TestApp::new();

    let tasks: Vec<_> = (0..20)
        .map(|n| {
            let users = app.users.clone();
            tokio::spawn(async move { users.create(&input(&format!("User {n}")), None).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(app.users.count(&json!({})).await.unwrap(), 20);
}
