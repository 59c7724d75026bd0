//! Integration tests for the note service
//!
//! Every test builds its own in-memory database and scripted authentication
//! client through `note_service::service!`.

pub mod auth_breaker;
pub mod health_test;
pub mod notes_flow;
pub mod outbox_dispatch;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use serde_json::Value;

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

pub async fn read_json<B: MessageBody>(response: ServiceResponse<B>) -> Value {
    let body = actix_web::test::read_body(response).await;
    serde_json::from_slice(&body).expect("response body should be JSON")
}
