//! Delivery of events produced over HTTP

use std::sync::Arc;

use actix_web::test::{call_service, TestRequest};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use note_service::config::OutboxConfig;
use note_service::entities::v1::notes_outbox::{self, NoteOutboxAction};
use note_service::outbox::{DispatchSummary, OutboxDispatcher, OutboxWriter};
use note_service::testing::instance::TOKEN;
use note_service::testing::mock::RecordingPublisher;

use super::{bearer, read_json};

async fn unsent(db: &sea_orm::DatabaseConnection) -> u64 {
    notes_outbox::Entity::find()
        .filter(notes_outbox::Column::Sent.eq(false))
        .count(db)
        .await
        .unwrap()
}

#[actix_web::test]
async fn test_events_from_requests_are_delivered_once_acknowledged() {
    let (service, instance) = note_service::service!();

    let request = TestRequest::post()
        .uri("/create")
        .insert_header(bearer(TOKEN))
        .set_json(json!({"notes": [{"title": "a"}, {"title": "b"}]}))
        .to_request();
    let body = read_json(call_service(&service, request).await).await;
    let id = body["ids"][0].as_str().unwrap().to_string();

    let request = TestRequest::get()
        .uri(&format!("/read?id={id}"))
        .insert_header(bearer(TOKEN))
        .to_request();
    call_service(&service, request).await;

    let publisher = Arc::new(RecordingPublisher::new());
    publisher.fail_next(1);
    let dispatcher = OutboxDispatcher::new(
        instance.db().clone(),
        OutboxWriter::new(),
        publisher.clone(),
        &OutboxConfig::default(),
    );

    let first = dispatcher.dispatch_once().await.unwrap();
    assert_eq!(first, DispatchSummary { claimed: 3, published: 2, failed: 1 });
    assert_eq!(unsent(instance.db()).await, 1);

    let second = dispatcher.dispatch_once().await.unwrap();
    assert_eq!(second, DispatchSummary { claimed: 1, published: 1, failed: 0 });
    assert_eq!(unsent(instance.db()).await, 0);

    let published = publisher.published();
    assert_eq!(published.len(), 3);
    for message in &published {
        assert_eq!(message.user_id, "user-1");
        assert_eq!(message.mutating, message.action != NoteOutboxAction::Read);
    }

    // Delivered rows are kept
    assert_eq!(notes_outbox::Entity::find().count(instance.db()).await.unwrap(), 3);
}

#[actix_web::test]
async fn test_nothing_to_dispatch() {
    let (_service, instance) = note_service::service!();

    let dispatcher = OutboxDispatcher::new(
        instance.db().clone(),
        OutboxWriter::new(),
        Arc::new(RecordingPublisher::new()),
        &OutboxConfig::default(),
    );

    assert_eq!(dispatcher.dispatch_once().await.unwrap(), DispatchSummary::default());
}
