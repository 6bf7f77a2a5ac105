//! Integration tests for paginated listing.

mod helpers;

use serde_json::json;

use docrepo::prelude::*;

#[tokio::test]
async fn test_out_of_range_options_are_clamped() {
    let app = helpers::TestApp::new();
    app.seed_users(120).await;

    let page = app
        .users
        .find_all(&json!({}), &ListOptions::page(0, 1000))
        .await
        .unwrap();

    assert_eq!(page.total, 120);
    assert_eq!(page.limit, 50);
    assert_eq!(page.page, 1);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.data.len(), 50);
    let ids: Vec<String> = page.data.iter().map(|u| u.id.clone()).collect();
    let expected: Vec<String> = (0..50).map(|n| format!("user-{n:03}")).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_last_page_is_partial() {
    let app = helpers::TestApp::new();
    app.seed_users(120).await;

    let page = app
        .users
        .find_all(&json!({}), &ListOptions::page(3, 50))
        .await
        .unwrap();

    assert_eq!(page.page, 3);
    assert_eq!(page.data.len(), 20);
    assert_eq!(page.data[0].id, "user-100");

    let beyond = app
        .users
        .find_all(&json!({}), &ListOptions::page(9, 50))
        .await
        .unwrap();
    assert_eq!(beyond.total, 120);
    assert!(beyond.data.is_empty());
}

#[tokio::test]
async fn test_query_sort_and_fields() {
    let app = helpers::TestApp::new();
    app.seed_users(10).await;

    let options = ListOptions::page(1, 3).with_sort("-id");
    let page = app
        .users
        .find_all(&json!({"age": {"$gte": 25}}), &options)
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 2);
    let ids: Vec<&str> = page.data.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, ["user-009", "user-008", "user-007"]);

    let options = ListOptions::page(1, 2).with_fields("age");
    let page = app
        .users
        .find_all_documents(&json!({"id": "user-004"}), &options)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(
        serde_json::Value::Object(page.data[0].clone()),
        json!({"_id": "user-004", "id": "user-004", "age": 24})
    );
}

#[tokio::test]
async fn test_empty_collection() {
    let app = helpers::TestApp::new();

    let page = app
        .users
        .find_all(&json!({}), &ListOptions::default())
        .await
        .unwrap();

    assert_eq!((page.total, page.limit, page.page, page.total_pages), (0, 50, 1, 0));
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn test_page_serializes_envelope() {
    let app = helpers::TestApp::new();
    app.seed_users(3).await;

    let page = app
        .users
        .find_all(&json!({}), &ListOptions::page(1, 2))
        .await
        .unwrap();
    let body = serde_json::to_value(&page).unwrap();

    assert_eq!(body["totalPages"], json!(2));
    assert_eq!(body["data"][0]["id"], json!("user-000"));
}
