use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pivot_core::model::metadata::MetadataDocument;
use pivot_core::{open_db, open_db_in_memory, ObjectRegistry};
use pivot_server::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const METADATA: &str = r#"{
    "types": {
        "article": {
            "label": "Article",
            "pivots": { "pivotable_objects": { "image": {} } }
        },
        "image": { "create_item_label": "Upload image" }
    }
}"#;

fn registry() -> ObjectRegistry {
    ObjectRegistry::from_metadata(&MetadataDocument::from_json_str(METADATA).unwrap()).unwrap()
}

fn app() -> Router {
    build_router(AppState::new(open_db_in_memory().unwrap(), registry()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn send_raw(
    app: &Router,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn assert_error_envelope(body: &Value) {
    assert_eq!(body["success"], false);
    let feedbacks = body["feedbacks"].as_array().unwrap();
    assert_eq!(feedbacks.len(), 1);
    assert_eq!(feedbacks[0]["level"], "error");
}

async fn seed(app: &Router) {
    for (obj_type, id) in [("article", json!(42)), ("image", json!(7)), ("image", json!(3))] {
        let (status, _) = send(
            app,
            "POST",
            "/object/save",
            Some(json!({ "obj_type": obj_type, "id": id, "data": { "title": "t" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = send(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn create_list_and_reorder_round_trip() {
    let app = app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/pivot/create",
        Some(json!({
            "obj_type": "article",
            "obj_id": 42,
            "target_object_type": "image",
            "pivots": [{ "target_object_id": 7 }, { "target_object_id": 3 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["feedbacks"][0]["level"], "success");

    let (status, body) = send(
        &app,
        "GET",
        "/pivot/list?obj_type=article&obj_id=42&target_object_type=image",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["object"]["id"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["7".to_string(), "3".to_string()]);

    let (status, body) = send(
        &app,
        "GET",
        "/pivot/belongs-to?obj_type=image&obj_id=3&source_object_type=article",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["object"]["id"], "42");

    let (status, body) = send(
        &app,
        "GET",
        "/pivot/widget?obj_type=article&obj_id=42&target_object_type=image&num_per_page=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["widget"]["total"], 2);
    assert_eq!(body["widget"]["entries"].as_array().unwrap().len(), 1);
    assert_eq!(body["widget"]["dialog_title"], "Upload image");
}

#[tokio::test]
async fn actions_answer_with_their_status_codes() {
    let app = app();

    let (status, body) = send(&app, "POST", "/pivot/remove", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app,
        "POST",
        "/pivot/remove",
        Some(json!({ "pivot_id": "6f1c7f4e-8a51-4c39-9f0e-0f3a7a6f2b11" })),
    )
    .await;
    assert_eq!(status.as_u16(), 418);

    let (status, _) = send(
        &app,
        "POST",
        "/pivot/add",
        Some(json!({
            "source_obj_type": "article",
            "source_obj_id": 42,
            "target_object_type": "image",
            "pivots": [{ "target_object_id": 7 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    seed(&app).await;
    let (status, body) = send(
        &app,
        "POST",
        "/pivot/add",
        Some(json!({
            "source_obj_type": "article",
            "source_obj_id": 42,
            "target_object_type": "image",
            "pivots": [{ "target_object_id": 7 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let pivot_id = body["pivots"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/pivot/remove",
        Some(json!({ "pivot_id": pivot_id, "delete_obj": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feedbacks"].as_array().unwrap().len(), 2);

    let (status, _) = send(
        &app,
        "POST",
        "/pivot/remove",
        Some(json!({ "pivot_id": pivot_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn save_object_rejects_unknown_types() {
    let (status, _) = send(
        &app(),
        "POST",
        "/object/save",
        Some(json!({ "obj_type": "video", "id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn file_backed_state_survives_router_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pivot.db");

    let first = build_router(AppState::new(open_db(&path).unwrap(), registry()));
    seed(&first).await;
    let (status, _) = send(
        &first,
        "POST",
        "/pivot/create",
        Some(json!({
            "obj_type": "article",
            "obj_id": "42",
            "target_object_type": "image",
            "pivots": [{ "target_object_id": "3" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    drop(first);

    let second = build_router(AppState::new(open_db(&path).unwrap(), registry()));
    let (_, body) = send(
        &second,
        "GET",
        "/pivot/list?obj_type=article&obj_id=42&target_object_type=image",
        None,
    )
    .await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn wrong_typed_fields_answer_the_feedback_envelope() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/pivot/create",
        Some(json!({
            "obj_type": "article",
            "obj_id": 42,
            "target_object_type": "image",
            "pivots": "7"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&body);

    let (status, body) = send(
        &app,
        "POST",
        "/pivot/add",
        Some(json!({
            "source_obj_type": 5,
            "source_obj_id": 42,
            "target_object_type": "image",
            "pivots": [{ "target_object_id": 7 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&body);

    let (status, body) = send_raw(&app, "/pivot/remove", Some("application/json"), "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&body);
}

#[tokio::test]
async fn non_json_bodies_answer_the_feedback_envelope() {
    let app = app();

    let (status, body) = send_raw(
        &app,
        "/pivot/create",
        Some("application/x-www-form-urlencoded"),
        "obj_type=article&obj_id=42&target_object_type=image",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&body);

    let (status, body) = send_raw(&app, "/pivot/remove", None, r#"{"pivot_id":"x"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&body);
}

#[tokio::test]
async fn empty_pivot_list_is_rejected_over_http() {
    let app = app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/pivot/create",
        Some(json!({
            "obj_type": "article",
            "obj_id": 42,
            "target_object_type": "image",
            "pivots": []
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&body);
}

#[tokio::test]
async fn remove_pair_with_unknown_type_is_a_validation_error() {
    let app = app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/pivot/remove-pair",
        Some(json!({
            "source_obj_type": "article",
            "source_obj_id": 42,
            "target_object_type": "video",
            "target_object_id": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&body);
}
