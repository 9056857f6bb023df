//! Document store behaviour: containment queries, optimistic versions and
//! unique keys, run against the in-memory store.

mod common;

use futures::future::join_all;
use serde_json::json;
use uuid::Uuid;

use aquavida::models::*;
use aquavida::services::classes;
use aquavida::store::{
    Collection, DocumentStore, MemoryStore, Query, RawDocument, UniqueKey, contains, load, persist, remove,
};
use aquavida::AppError;

use common::*;

fn raw(collection: Collection, id: Uuid, version: i64, body: serde_json::Value) -> RawDocument {
    RawDocument {
        collection,
        id,
        expected_version: version,
        body,
        unique_keys: Vec::new(),
    }
}

/// Test 1: Containment matches nested objects and array members
#[test]
fn test_contains() {
    let doc = json!({
        "status": "pending",
        "period": { "month": 3, "year": 2025 },
        "enrolled": ["a", "b"],
        "waitlist": [{ "student_id": "x", "priority": 1 }]
    });

    assert!(contains(&doc, &json!({})));
    assert!(contains(&doc, &json!({ "period": { "year": 2025 } })));
    assert!(contains(&doc, &json!({ "enrolled": ["b"] })));
    assert!(contains(&doc, &json!({ "enrolled": "a" })));
    assert!(contains(&doc, &json!({ "waitlist": [{ "student_id": "x" }] })));
    assert!(!contains(&doc, &json!({ "status": "paid" })));
    assert!(!contains(&doc, &json!({ "period": { "month": 4 } })));
    assert!(!contains(&doc, &json!({ "missing": null })));
}

/// Test 2: Sorted and paginated finds
#[tokio::test]
async fn test_sort_and_paginate() {
    init_logging();
    let store = MemoryStore::new();
    for (price, active) in [(120.0, true), (80.0, true), (200.0, false), (150.0, true)] {
        store
            .save(raw(Collection::Plans, Uuid::new_v4(), 0, json!({ "price": price, "active": active })))
            .await
            .unwrap();
    }

    let active = Query::filter(json!({ "active": true }));
    let prices = |docs: Vec<serde_json::Value>| docs.iter().map(|d| d["price"].as_f64().unwrap()).collect::<Vec<_>>();

    let ascending = store.find(Collection::Plans, &active.clone().sort_by("price", false)).await.unwrap();
    assert_eq!(prices(ascending), vec![80.0, 120.0, 150.0]);

    let page = store
        .find(Collection::Plans, &active.sort_by("price", true).paginate(2, 1))
        .await
        .unwrap();
    assert_eq!(prices(page), vec![120.0, 80.0]);

    assert_eq!(store.len(Collection::Plans), 4);
    assert_eq!(store.len(Collection::Payments), 0);
}

/// Test 3: A save based on an old version is refused
#[tokio::test]
async fn test_stale_write() {
    init_logging();
    let store = MemoryStore::new();
    let teacher = seed_teacher(&store, 1).await;
    let class = seed_class(&store, teacher.id, 10).await;

    let mut first: Class = load(&store, class.id).await.unwrap();
    let mut second: Class = load(&store, class.id).await.unwrap();
    first.name = "Golfinhos".to_string();
    persist(&store, &mut first).await.unwrap();
    assert_eq!(first.version, class.version + 1);

    second.name = "Baleias".to_string();
    let err = persist(&store, &mut second).await.unwrap_err();
    assert_eq!(err, AppError::StaleWrite { entity: "Class", id: class.id });

    let stored: Class = load(&store, class.id).await.unwrap();
    assert_eq!(stored.name, "Golfinhos");
}

/// Test 4: Inserting over an existing id is a stale write too
#[tokio::test]
async fn test_insert_over_existing() {
    init_logging();
    let store = MemoryStore::new();
    let id = Uuid::new_v4();
    store.save(raw(Collection::Lessons, id, 0, json!({ "title": "a" }))).await.unwrap();
    let err = store.save(raw(Collection::Lessons, id, 0, json!({ "title": "b" }))).await.unwrap_err();
    assert!(matches!(err, AppError::StaleWrite { .. }));
}

/// Test 5: Teachers cannot share a CPF
#[tokio::test]
async fn test_duplicate_teacher_cpf() {
    init_logging();
    let store = MemoryStore::new();
    seed_teacher(&store, 1).await;

    let mut request = teacher_request(2);
    request.cpf = cpf(1);
    let err = aquavida::services::teachers::create_teacher(&store, request).await.unwrap_err();
    assert!(matches!(err, AppError::Duplicate { ref field, .. } if field == "cpf"));
    assert_eq!(store.len(Collection::Teachers), 1);
}

/// Test 6: Unique keys move with the document and are freed on delete
#[tokio::test]
async fn test_unique_key_lifecycle() {
    init_logging();
    let store = MemoryStore::new();
    let key = |value: &str| vec![UniqueKey::new("student_lesson", value)];
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    let mut doc = raw(Collection::Attendance, first, 0, json!({}));
    doc.unique_keys = key("s1:l1");
    let version = store.save(doc).await.unwrap();

    let mut clash = raw(Collection::Attendance, second, 0, json!({}));
    clash.unique_keys = key("s1:l1");
    assert!(matches!(store.save(clash.clone()).await, Err(AppError::Duplicate { .. })));

    // Re-keying the first record releases the old value.
    let mut moved = raw(Collection::Attendance, first, version, json!({}));
    moved.unique_keys = key("s1:l2");
    store.save(moved).await.unwrap();
    store.save(clash).await.unwrap();

    assert!(store.delete(Collection::Attendance, first).await.unwrap());
    assert!(!store.delete(Collection::Attendance, first).await.unwrap());
    let mut reuse = raw(Collection::Attendance, Uuid::new_v4(), 0, json!({}));
    reuse.unique_keys = key("s1:l2");
    store.save(reuse).await.unwrap();
}

/// Test 7: Removing a missing entity reports NotFound
#[tokio::test]
async fn test_remove_missing() {
    init_logging();
    let store = MemoryStore::new();
    let id = Uuid::new_v4();
    assert_eq!(
        remove::<Lesson>(&store, id).await.unwrap_err(),
        AppError::NotFound { entity: "Lesson", id }
    );
}

/// Test 8: Two students racing for the last seat, only one gets it
#[tokio::test]
async fn test_last_seat_race() {
    init_logging();
    let store = MemoryStore::new();
    let teacher = seed_teacher(&store, 1).await;
    let class = seed_class(&store, teacher.id, 1).await;
    let a = seed_student(&store, 1).await;
    let b = seed_student(&store, 2).await;

    let results = join_all([
        classes::enroll_student(&store, clock(), class.id, a.id),
        classes::enroll_student(&store, clock(), class.id, b.id),
    ])
    .await;

    let won = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(won, 1);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(
        e,
        AppError::CapacityExceeded { .. } | AppError::StaleWrite { .. }
    )));

    let class: Class = load(&store, class.id).await.unwrap();
    assert_eq!(class.enrolled.len(), 1);
}
