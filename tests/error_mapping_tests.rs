//! HTTP status codes and the JSON error envelope produced for each error.

use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use serde_json::Value;
use uuid::Uuid;

use aquavida::{AppError, ErrorKind};

async fn envelope(err: &AppError) -> Value {
    let resp = err.error_response();
    let bytes = to_bytes(resp.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Test 1: Each error kind maps to its status code
#[actix_web::test]
async fn test_status_codes() {
    let id = Uuid::new_v4();
    let cases = [
        (AppError::Validation("bad".to_string()), StatusCode::BAD_REQUEST),
        (AppError::NotFound { entity: "Class", id }, StatusCode::NOT_FOUND),
        (AppError::CapacityExceeded { class_id: id, capacity: 10 }, StatusCode::CONFLICT),
        (AppError::StaleWrite { entity: "Class", id }, StatusCode::CONFLICT),
        (AppError::invalid_transition("Lesson", "completed", "start"), StatusCode::CONFLICT),
        (AppError::LockedForEditing { entity: "Evaluation", id }, StatusCode::LOCKED),
        (AppError::Database, StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, status) in cases {
        assert_eq!(err.status_code(), status, "{:?}", err);
    }
}

/// Test 2: Conflicts carry their code and message
#[actix_web::test]
async fn test_conflict_envelope() {
    let class_id = Uuid::new_v4();
    let err = AppError::CapacityExceeded { class_id, capacity: 12 };
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let body = envelope(&err).await;
    assert_eq!(body["error"]["code"], "CAPACITY_EXCEEDED");
    assert_eq!(body["error"]["message"], format!("Class {} is full (12 seats)", class_id));
}

/// Test 3: Transition errors name the state without Debug quotes
#[actix_web::test]
async fn test_invalid_transition_message() {
    let body = envelope(&AppError::invalid_transition("Payment", "paid", "cancel")).await;
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
    assert_eq!(body["error"]["message"], "Cannot cancel Payment in state paid");
}

/// Test 4: Internal errors hide their details
#[actix_web::test]
async fn test_internal_errors_are_opaque() {
    let body = envelope(&AppError::Database).await;
    assert_eq!(body["error"]["code"], "DATABASE_ERROR");
    assert_eq!(body["error"]["message"], "Internal server error");
}
