//! Integration tests for read, population and aggregation paths.

mod helpers;

use serde_json::{Value, json};

use docrepo::prelude::*;

#[tokio::test]
async fn test_find_one_by_public_id() -> anyhow::Result<()> {
    let app = helpers::TestApp::new();
    app.seed("users", json!({"_id": "abc123", "name": "Ann"})).await;
    app.seed("users", json!({"_id": "def456", "name": "Bob"})).await;

    let user = app
        .users
        .find_one(&json!({"id": "abc123"}), None, &FindOptions::default())
        .await?
        .ok_or_else(|| anyhow::anyhow!("abc123 not found"))?;

    assert_eq!(user.id, "abc123");
    assert_eq!(user.name, "Ann");
    Ok(())
}

#[tokio::test]
async fn test_reads_expose_both_identifiers() {
    let app = helpers::TestApp::new();
    app.seed("users", json!({"_id": "abc123", "name": "Ann", "secret": "s"}))
        .await;
    let raw = app.repository::<helpers::User>("users");

    let documents = raw
        .find_and_populate(&json!({"id": "abc123"}), &[], Some(&Projection::exclude(["secret"])))
        .await
        .unwrap();

    assert_eq!(
        Value::Object(documents[0].clone()),
        json!({"_id": "abc123", "id": "abc123", "name": "Ann"})
    );
}

#[tokio::test]
async fn test_primitive_filter_is_passed_through() {
    let app = helpers::TestApp::new();
    app.seed("users", json!({"_id": "abc123", "name": "Ann"})).await;

    let found = app
        .users
        .find(&json!("abc123"), None, &FindOptions::default())
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "abc123");
    assert_eq!(app.users.count(&json!("nope")).await.unwrap(), 0);
}

#[tokio::test]
async fn test_nested_id_is_not_rewritten() {
    let app = helpers::TestApp::new();
    app.seed(
        "users",
        json!({"_id": "abc123", "name": "Ann", "team": {"id": "t1"}}),
    )
    .await;

    let count = app.users.count(&json!({"team.id": "t1"})).await.unwrap();
    assert_eq!(count, 1);
    let count = app
        .users
        .count(&json!({"team": {"id": "t1"}}))
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_find_with_projection_and_sort() {
    let app = helpers::TestApp::new();
    app.seed_users(5).await;

    let options = FindOptions {
        sort: Some(SortSpec::parse("-age")),
        skip: Some(1),
        limit: Some(2),
    };
    let users = app
        .users
        .find(&json!({}), Some(&Projection::include(["name"])), &options)
        .await
        .unwrap();

    let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["User 3", "User 2"]);
    assert!(users.iter().all(|u| u.age.is_none()));
}

#[tokio::test]
async fn test_populate_single_and_many() {
    let app = helpers::TestApp::new();
    app.seed("users", json!({"_id": "u1", "name": "Ann"})).await;
    app.seed("users", json!({"_id": "u2", "name": "Bob"})).await;
    app.seed(
        "teams",
        json!({"_id": "t1", "lead": "u1", "members": ["u1", "u2", "ghost"]}),
    )
    .await;

    let teams = app.repository::<helpers::User>("teams");
    let options = [
        PopulateOptions::new("lead", "users").select(Projection::include(["name"])),
        PopulateOptions::new("members", "users"),
    ];

    let populated = teams
        .find_and_populate(&json!({"id": "t1"}), &options, None)
        .await
        .unwrap();
    assert_eq!(populated.len(), 1);
    let team = &populated[0];
    assert_eq!(team["id"], json!("t1"));
    assert_eq!(team["lead"], json!({"_id": "u1", "id": "u1", "name": "Ann"}));
    let members: Vec<&Value> = team["members"].as_array().unwrap().iter().map(|m| &m["id"]).collect();
    assert_eq!(members, [&json!("u1"), &json!("u2")]);

    let single = app
        .users
        .populate(json!({"_id": "x", "owner": "u2"}), &[PopulateOptions::new("owner", "users")])
        .await
        .unwrap();
    assert!(single.is_object());
    assert_eq!(single["owner"]["name"], json!("Bob"));

    let many = app
        .users
        .populate(json!([{"owner": "u1"}, {"owner": "missing"}]), &[PopulateOptions::new("owner", "users")])
        .await
        .unwrap();
    assert_eq!(many.as_array().unwrap().len(), 2);
    assert_eq!(many[0]["owner"]["name"], json!("Ann"));
    assert_eq!(many[1]["owner"], json!("missing"));
}

#[tokio::test]
async fn test_aggregate_runs_stages_in_order() {
    let app = helpers::TestApp::new();
    app.seed_users(6).await;

    let pipeline: Vec<Document> = [
        json!({"$match": {"age": {"$gte": 22}}}),
        json!({"$sort": {"age": -1}}),
        json!({"$limit": 2}),
        json!({"$project": {"name": 1, "_id": 0}}),
    ]
    .into_iter()
    .map(|stage| stage.as_object().cloned().unwrap())
    .collect();

    let rows = app.users.aggregate(&pipeline).await.unwrap();
    assert_eq!(
        rows.into_iter().map(Value::Object).collect::<Vec<_>>(),
        vec![json!({"name": "User 5"}), json!({"name": "User 4"})]
    );
}

#[tokio::test]
async fn test_store_failures_propagate() {
    let app = helpers::TestApp::new();
    app.seed_users(2).await;

    let err = app
        .users
        .find(&json!({"age": {"$near": 3}}), None, &FindOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = app
        .users
        .find_all(&json!({}), &ListOptions::default().with_fields("name,-age"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}
