//! Integration tests for the unauthenticated endpoints
//!
//! - /health (database and breaker status)
//! - /metrics (Prometheus text)
//! - /api.json (OpenAPI document)

use actix_web::http::StatusCode;
use actix_web::test::{call_service, read_body, TestRequest};

use note_service::testing::instance::TOKEN;

use super::{bearer, read_json};

#[actix_web::test]
async fn test_health_endpoint_returns_200_ok() {
    let (service, _instance) = note_service::service!();

    let req = TestRequest::get().uri("/health").to_request();
    let resp = call_service(&service, req).await;

    assert_eq!(resp.status(), StatusCode::OK, "/health should return 200 OK");

    let body = read_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["authCircuit"], "Closed");
    assert!(body["timestamp"].as_str().is_some_and(|t| t.contains('T')));
}

#[actix_web::test]
async fn test_metrics_reflect_served_requests() {
    let (service, _instance) = note_service::service!();

    let req = TestRequest::get()
        .uri("/search?query=")
        .insert_header(bearer(TOKEN))
        .to_request();
    call_service(&service, req).await;

    let req = TestRequest::get().uri("/metrics").to_request();
    let resp = call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = read_body(resp).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(body.contains("http_requests_total"));
    assert!(body.contains("auth_requests_total"));
    assert!(body.contains("circuit_breaker_state"));
}

#[actix_web::test]
async fn test_openapi_document_is_served() {
    let (service, _instance) = note_service::service!();

    let req = TestRequest::get().uri("/api.json").to_request();
    let resp = call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = read_json(resp).await;
    assert!(body["paths"]["/create"]["post"].is_object());
    assert!(body["paths"]["/search"]["get"].is_object());
}
