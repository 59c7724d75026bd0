//! Note routes end to end
//!
//! Each test checks both the HTTP answer and the outbox rows the request
//! left behind.

use actix_web::http::StatusCode;
use actix_web::test::{call_service, TestRequest};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Statement};
use serde_json::{json, Value};

use note_service::entities::v1::notes;
use note_service::entities::v1::notes_outbox::{self, NoteOutboxAction};
use note_service::testing::instance::TOKEN;

use super::{bearer, read_json};

async fn actions(db: &sea_orm::DatabaseConnection) -> Vec<NoteOutboxAction> {
    notes_outbox::Entity::find()
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|event| event.action)
        .collect()
}

#[actix_web::test]
async fn test_create_returns_ids_and_errors_per_note() {
    let (service, instance) = note_service::service!();

    let request = TestRequest::post()
        .uri("/create")
        .insert_header(bearer(TOKEN))
        .set_json(json!({
            "notes": [
                {"title": "groceries", "content": "milk"},
                {"title": "", "content": "no title"},
                {"title": "weekend", "content": "hike"},
            ]
        }))
        .to_request();
    let response = call_service(&service, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["ids"].as_array().unwrap().len(), 2);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    assert_eq!(body["errors"][0]["index"], 1);

    assert_eq!(notes::Entity::find().count(instance.db()).await.unwrap(), 2);
    assert_eq!(
        actions(instance.db()).await,
        vec![NoteOutboxAction::Created, NoteOutboxAction::Created]
    );
}

#[actix_web::test]
async fn test_full_note_lifecycle_writes_one_event_per_action() {
    let (service, instance) = note_service::service!();

    let request = TestRequest::post()
        .uri("/create")
        .insert_header(bearer(TOKEN))
        .set_json(json!({"notes": [{"title": "groceries", "content": "milk"}]}))
        .to_request();
    let body = read_json(call_service(&service, request).await).await;
    let id = body["ids"][0].as_str().unwrap().to_string();

    // Read
    let request = TestRequest::get()
        .uri(&format!("/read?id={id}"))
        .insert_header(bearer(TOKEN))
        .to_request();
    let response = call_service(&service, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["note"]["title"], "groceries");
    assert_eq!(body["note"]["user_id"], "user-1");

    // Update
    let request = TestRequest::post()
        .uri("/update")
        .insert_header(bearer(TOKEN))
        .set_json(json!({"id": id, "title": "groceries", "content": "milk and eggs"}))
        .to_request();
    let body = read_json(call_service(&service, request).await).await;
    assert_eq!(body["updated"], true);

    // Search
    let request = TestRequest::get()
        .uri("/search?query=eggs")
        .insert_header(bearer(TOKEN))
        .to_request();
    let body = read_json(call_service(&service, request).await).await;
    let found: &Vec<Value> = body["notes"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["content"], "milk and eggs");

    // Delete
    let request = TestRequest::post()
        .uri("/delete")
        .insert_header(bearer(TOKEN))
        .set_json(json!({"id": id}))
        .to_request();
    let body = read_json(call_service(&service, request).await).await;
    assert_eq!(body["deleted"], true);

    // Read after delete
    let request = TestRequest::get()
        .uri(&format!("/read?id={id}"))
        .insert_header(bearer(TOKEN))
        .to_request();
    assert_eq!(call_service(&service, request).await.status(), StatusCode::NOT_FOUND);

    assert_eq!(
        actions(instance.db()).await,
        vec![
            NoteOutboxAction::Created,
            NoteOutboxAction::Read,
            NoteOutboxAction::Updated,
            NoteOutboxAction::Search,
            NoteOutboxAction::Deleted,
        ]
    );
}

#[actix_web::test]
async fn test_update_with_empty_title_is_rejected_without_event() {
    let (service, instance) = note_service::service!();

    let request = TestRequest::post()
        .uri("/update")
        .insert_header(bearer(TOKEN))
        .set_json(json!({"id": "7f1c6b1e-5d7a-4a53-9a3c-2f7c1f3d9b10", "title": " "}))
        .to_request();
    let response = call_service(&service, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_json(response).await["message"].is_string());
    assert!(actions(instance.db()).await.is_empty());
}

#[actix_web::test]
async fn test_unknown_note_is_reported_without_event() {
    let (service, instance) = note_service::service!();

    let request = TestRequest::post()
        .uri("/delete")
        .insert_header(bearer(TOKEN))
        .set_json(json!({"id": "7f1c6b1e-5d7a-4a53-9a3c-2f7c1f3d9b10"}))
        .to_request();
    let body = read_json(call_service(&service, request).await).await;

    assert_eq!(body["deleted"], false);
    assert!(actions(instance.db()).await.is_empty());
}

#[actix_web::test]
async fn test_outbox_failure_rolls_back_the_note_change() {
    let (service, instance) = note_service::service!();

    let request = TestRequest::post()
        .uri("/create")
        .insert_header(bearer(TOKEN))
        .set_json(json!({"notes": [{"title": "kept", "content": ""}]}))
        .to_request();
    let body = read_json(call_service(&service, request).await).await;
    let id = body["ids"][0].as_str().unwrap().to_string();

    let db = instance.db();
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "DROP TABLE notes_outbox".to_string(),
    ))
    .await
    .unwrap();

    // Bulk create: every note of the failed batch is reported, none stored
    let request = TestRequest::post()
        .uri("/create")
        .insert_header(bearer(TOKEN))
        .set_json(json!({"notes": [{"title": "a"}, {"title": "b"}]}))
        .to_request();
    let response = call_service(&service, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!(body["ids"].as_array().unwrap().is_empty());
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);
    assert_eq!(notes::Entity::find().count(db).await.unwrap(), 1);

    // Update: the note keeps its old content
    let request = TestRequest::post()
        .uri("/update")
        .insert_header(bearer(TOKEN))
        .set_json(json!({"id": id, "title": "changed", "content": "changed"}))
        .to_request();
    let response = call_service(&service, request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let stored = notes::Entity::find().one(db).await.unwrap().unwrap();
    assert_eq!(stored.title, "kept");

    // Delete: the note survives
    let request = TestRequest::post()
        .uri("/delete")
        .insert_header(bearer(TOKEN))
        .set_json(json!({"id": id}))
        .to_request();
    let response = call_service(&service, request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(notes::Entity::find().count(db).await.unwrap(), 1);
}

#[actix_web::test]
async fn test_notes_are_scoped_to_their_owner() {
    use note_service::models::v1::User;
    use note_service::testing::mock::MockReply;

    let (service, instance) = note_service::service!();
    instance
        .client
        .set_reply("other", MockReply::Valid(User::new("user-2", "JaneDoe")));

    let request = TestRequest::post()
        .uri("/create")
        .insert_header(bearer(TOKEN))
        .set_json(json!({"notes": [{"title": "private", "content": "mine"}]}))
        .to_request();
    let body = read_json(call_service(&service, request).await).await;
    let id = body["ids"][0].as_str().unwrap().to_string();

    let request = TestRequest::get()
        .uri(&format!("/read?id={id}"))
        .insert_header(bearer("other"))
        .to_request();
    assert_eq!(call_service(&service, request).await.status(), StatusCode::NOT_FOUND);

    let request = TestRequest::get()
        .uri("/search?query=private")
        .insert_header(bearer("other"))
        .to_request();
    let body = read_json(call_service(&service, request).await).await;
    assert!(body["notes"].as_array().unwrap().is_empty());

    assert_eq!(actions(instance.db()).await, vec![NoteOutboxAction::Created]);
}
