//! Bearer authentication through the shared circuit breaker

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::test::{call_service, TestRequest};

use note_service::auth::TransportError;
use note_service::models::v1::User;
use note_service::resilience::{CircuitBreakerConfig, CircuitState};
use note_service::testing::instance::{Instance, TOKEN};
use note_service::testing::mock::MockReply;

use super::{bearer, read_json};

fn small_breaker() -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        record_length: 3,
        timeout: Duration::from_millis(50),
        percentile: 0.5,
        recovery_requests: 2,
    }
}

#[actix_web::test]
async fn test_missing_token_is_unauthorized_without_remote_call() {
    let (service, instance) = note_service::service!();

    let request = TestRequest::get().uri("/search").to_request();
    let response = call_service(&service, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(instance.client.calls(), 0);
    assert_eq!(instance.breaker().total_results(), 0);
}

#[actix_web::test]
async fn test_invalid_token_is_unauthorized_and_counts_as_success() {
    let (service, instance) = note_service::service!();

    let request = TestRequest::get()
        .uri("/search")
        .insert_header(bearer("not-a-token"))
        .to_request();
    let response = call_service(&service, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["message"], "Invalid token");
    assert_eq!(instance.breaker().total_results(), 1);
    assert_eq!(instance.breaker().total_failures(), 0);
}

#[actix_web::test]
async fn test_transport_failure_is_bad_gateway() {
    let (service, instance) = note_service::service!();
    instance
        .client
        .set_reply(TOKEN, MockReply::Fail(TransportError::Status(500)));

    let request = TestRequest::get()
        .uri("/search")
        .insert_header(bearer(TOKEN))
        .to_request();
    let response = call_service(&service, request).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(instance.breaker().total_failures(), 1);
}

#[actix_web::test]
async fn test_open_breaker_fails_fast_then_recovers() {
    let (service, instance) = note_service::service!(Instance::with_breaker(small_breaker()).await);
    instance
        .client
        .set_reply(TOKEN, MockReply::Fail(TransportError::Request("connection refused".to_string())));

    let search = || {
        TestRequest::get()
            .uri("/search")
            .insert_header(bearer(TOKEN))
            .to_request()
    };

    for _ in 0..3 {
        assert_eq!(call_service(&service, search()).await.status(), StatusCode::BAD_GATEWAY);
    }
    assert_eq!(instance.breaker().state(), CircuitState::Open);

    // Open: answered locally, the client is not touched
    let response = call_service(&service, search()).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(instance.client.calls(), 3);

    // Health stays up and reports the breaker
    let response = call_service(&service, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["authCircuit"], "Open");

    // The service comes back, after the timeout trials close the breaker
    instance
        .client
        .set_reply(TOKEN, MockReply::Valid(User::new("user-1", "JohnDoe")));
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(call_service(&service, search()).await.status(), StatusCode::OK);
    assert_eq!(instance.breaker().state(), CircuitState::HalfOpen);
    assert_eq!(call_service(&service, search()).await.status(), StatusCode::OK);
    assert_eq!(instance.breaker().state(), CircuitState::Closed);
    assert_eq!(instance.client.calls(), 5);
}

#[actix_web::test]
async fn test_failed_trial_reopens_the_breaker() {
    let (service, instance) = note_service::service!(Instance::with_breaker(small_breaker()).await);
    instance
        .client
        .set_reply(TOKEN, MockReply::Fail(TransportError::Status(503)));

    let search = || {
        TestRequest::get()
            .uri("/search")
            .insert_header(bearer(TOKEN))
            .to_request()
    };

    for _ in 0..3 {
        call_service(&service, search()).await;
    }
    assert_eq!(instance.breaker().state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(call_service(&service, search()).await.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(instance.breaker().state(), CircuitState::Open);
    assert_eq!(
        call_service(&service, search()).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}
