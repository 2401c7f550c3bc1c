use pivot_core::action::{
    AddRequest, CreateRequest, RemovePairRequest, RemoveRequest, STATUS_BAD_REQUEST,
    STATUS_MISSING_STORAGE, STATUS_NOT_FOUND, STATUS_OK,
};
use pivot_core::db::open_db_in_memory;
use pivot_core::model::metadata::MetadataDocument;
use pivot_core::{
    FeedbackLevel, ObjectId, ObjectRegistry, ObjectRepository, ObjectType, PivotActions,
    SqliteObjectRepository, StoredObject,
};
use rusqlite::Connection;
use serde_json::{json, Value};

const METADATA: &str = r#"{
    "types": {
        "article": {
            "label": "Article",
            "pivots": { "pivotable_objects": { "image": { "label": "Gallery" } } }
        },
        "image": { "create_item_label": "New image" }
    }
}"#;

fn registry() -> ObjectRegistry {
    ObjectRegistry::from_metadata(&MetadataDocument::from_json_str(METADATA).unwrap()).unwrap()
}

fn seed(conn: &Connection) {
    let objects = SqliteObjectRepository::new(conn);
    objects
        .save_object(&StoredObject::new(
            ObjectType::parse("article").unwrap(),
            ObjectId::from(42),
        ))
        .unwrap();
    for id in [3, 7] {
        objects
            .save_object(&StoredObject::new(
                ObjectType::parse("image").unwrap(),
                ObjectId::from(id),
            ))
            .unwrap();
    }
}

fn create_request(body: Value) -> CreateRequest {
    serde_json::from_value(body).unwrap()
}

#[test]
fn create_replaces_pivots_and_reports_success() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let registry = registry();
    let actions = PivotActions::new(&conn, &registry);

    let response = actions.create(&create_request(json!({
        "obj_type": "article",
        "obj_id": 42,
        "target_object_type": "image",
        "pivots": [{ "target_object_id": 7 }, { "target_object_id": "3" }]
    })));

    assert!(response.is_success());
    assert_eq!(response.status, STATUS_OK);
    assert_eq!(response.feedbacks[0].level, FeedbackLevel::Success);
    let stored = response
        .pivots
        .iter()
        .map(|pivot| (pivot.target_object_id.to_string(), pivot.position))
        .collect::<Vec<_>>();
    assert_eq!(stored, vec![("7".to_string(), 0), ("3".to_string(), 1)]);

    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["success"], json!(true));
    assert!(body.get("status").is_none());
}

#[test]
fn create_and_add_reject_invalid_parameters_with_400() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let registry = registry();
    let actions = PivotActions::new(&conn, &registry);

    let missing_type = actions.create(&create_request(json!({
        "obj_id": 42,
        "target_object_type": "image",
        "pivots": [{ "target_object_id": 7 }]
    })));
    assert_eq!(missing_type.status, STATUS_BAD_REQUEST);
    assert!(!missing_type.success);

    let empty = actions.create(&create_request(json!({
        "obj_type": "article",
        "obj_id": 42,
        "target_object_type": "image",
        "pivots": []
    })));
    assert_eq!(empty.status, STATUS_BAD_REQUEST);

    let unknown_target = actions.create(&create_request(json!({
        "obj_type": "article",
        "obj_id": 42,
        "target_object_type": "video",
        "pivots": [{ "target_object_id": 1 }]
    })));
    assert_eq!(unknown_target.status, STATUS_BAD_REQUEST);

    let add: AddRequest = serde_json::from_value(json!({
        "source_obj_type": "article",
        "source_obj_id": 42,
        "target_object_type": "image"
    }))
    .unwrap();
    assert_eq!(actions.add(&add).status, STATUS_BAD_REQUEST);
}

#[test]
fn create_for_missing_source_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let registry = registry();
    let actions = PivotActions::new(&conn, &registry);

    let response = actions.create(&create_request(json!({
        "obj_type": "article",
        "obj_id": 99,
        "target_object_type": "image",
        "pivots": [{ "target_object_id": 7 }]
    })));
    assert_eq!(response.status, STATUS_NOT_FOUND);
    assert_eq!(response.feedbacks.len(), 1);
}

#[test]
fn add_appends_after_existing_pivots() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let registry = registry();
    let actions = PivotActions::new(&conn, &registry);

    actions.create(&create_request(json!({
        "obj_type": "article",
        "obj_id": 42,
        "target_object_type": "image",
        "pivots": [{ "target_object_id": 7 }]
    })));
    let add: AddRequest = serde_json::from_value(json!({
        "source_obj_type": "article",
        "source_obj_id": "42",
        "target_object_type": "image",
        "pivots": [{ "target_object_id": 3 }]
    }))
    .unwrap();

    let response = actions.add(&add);
    assert_eq!(response.status, STATUS_OK);
    assert_eq!(response.pivots.len(), 1);
    assert_eq!(response.pivots[0].position, 1);
}

#[test]
fn remove_maps_each_failure_to_its_status() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let actions = PivotActions::new(&conn, &registry);

    let missing_id = actions.remove(&RemoveRequest::default());
    assert_eq!(missing_id.status, STATUS_BAD_REQUEST);

    let no_table = actions.remove(&RemoveRequest {
        pivot_id: Some(json!(uuid::Uuid::new_v4().to_string())),
        delete_obj: None,
    });
    assert_eq!(no_table.status, STATUS_MISSING_STORAGE);

    seed(&conn);
    let created = actions.create(&create_request(json!({
        "obj_type": "article",
        "obj_id": 42,
        "target_object_type": "image",
        "pivots": [{ "target_object_id": 7 }, { "target_object_id": 3 }]
    })));

    let unknown = actions.remove(&RemoveRequest {
        pivot_id: Some(json!(uuid::Uuid::new_v4().to_string())),
        delete_obj: None,
    });
    assert_eq!(unknown.status, STATUS_NOT_FOUND);

    let not_a_uuid = actions.remove(&RemoveRequest {
        pivot_id: Some(json!("abc")),
        delete_obj: None,
    });
    assert_eq!(not_a_uuid.status, STATUS_NOT_FOUND);

    let detach = actions.remove(&RemoveRequest {
        pivot_id: Some(json!(created.pivots[0].id.to_string())),
        delete_obj: Some(json!("0")),
    });
    assert_eq!(detach.status, STATUS_OK);
    assert_eq!(detach.feedbacks.len(), 1);

    let cascade = actions.remove(&RemoveRequest {
        pivot_id: Some(json!(created.pivots[1].id.to_string())),
        delete_obj: Some(json!("yes")),
    });
    assert_eq!(cascade.status, STATUS_OK);
    assert_eq!(cascade.feedbacks.len(), 2);
    let images = SqliteObjectRepository::new(&conn);
    let deleted = pivot_core::ObjectRef::parse("image", "3").unwrap();
    assert!(images.load_object(&deleted).unwrap().is_none());
}

#[test]
fn remove_pair_reports_not_attached_pairs() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let registry = registry();
    let actions = PivotActions::new(&conn, &registry);
    actions.create(&create_request(json!({
        "obj_type": "article",
        "obj_id": 42,
        "target_object_type": "image",
        "pivots": [{ "target_object_id": 7 }]
    })));

    let request = RemovePairRequest {
        source_obj_type: Some("article".to_string()),
        source_obj_id: Some(json!(42)),
        target_object_type: Some("image".to_string()),
        target_object_id: Some(json!(7)),
    };
    assert_eq!(actions.remove_pair(&request).status, STATUS_OK);
    assert_eq!(actions.remove_pair(&request).status, STATUS_NOT_FOUND);
}

#[test]
fn remove_pair_with_unregistered_type_is_bad_request() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let registry = registry();
    let actions = PivotActions::new(&conn, &registry);

    let response = actions.remove_pair(&RemovePairRequest {
        source_obj_type: Some("article".to_string()),
        source_obj_id: Some(json!(42)),
        target_object_type: Some("video".to_string()),
        target_object_id: Some(json!(1)),
    });
    assert_eq!(response.status, STATUS_BAD_REQUEST);
    assert_eq!(response.feedbacks[0].msg, "Unknown object type \"video\".");
}
