//! Unit tests for configuration loading
//!
//! - Loading config/default.toml
//! - Environment variable precedence
//! - Validation of invalid values

use note_service::config::*;
use serial_test::serial;
use std::env;

mod utils {
    /// Clean up environment variables with NOTE_SERVICE prefix
    pub fn clean_env_vars() {
        let keys: Vec<String> = std::env::vars()
            .filter(|(k, _)| k.starts_with("NOTE_SERVICE"))
            .map(|(k, _)| k)
            .collect();

        for key in keys {
            unsafe { std::env::remove_var(&key) };
        }
        unsafe { std::env::remove_var("APP_ENV") };
    }
}

// =============================================================================
// Loading default configuration
// =============================================================================

#[test]
#[serial]
fn test_load_default_config_success() {
    utils::clean_env_vars();

    let config = load();
    assert!(config.is_ok(), "Failed to load default configuration: {:?}", config.err());
    let config = config.unwrap();

    assert_eq!(config.app.name, "note-service");
    assert_eq!(config.app.environment, "development");
    assert_eq!(config.server.port, 8080);

    assert_eq!(config.auth.circuit_breaker.record_length, 100);
    assert_eq!(config.auth.circuit_breaker.timeout_ms, 5000);
    assert_eq!(config.auth.circuit_breaker.percentile, 0.3);
    assert_eq!(config.auth.circuit_breaker.recovery_requests, 10);

    assert_eq!(config.notes.create_notes_batch_size, 100);
    assert!(config.outbox.enabled);
    assert_eq!(config.outbox.publisher.kind, PublisherKind::Log);

    utils::clean_env_vars();
}

// =============================================================================
// Environment variable overrides
// =============================================================================

#[test]
#[serial]
fn test_env_overrides_nested_values() {
    utils::clean_env_vars();
    unsafe {
        env::set_var("NOTE_SERVICE__SERVER__PORT", "9090");
        env::set_var("NOTE_SERVICE__AUTH__CIRCUIT_BREAKER__RECORD_LENGTH", "20");
        env::set_var("NOTE_SERVICE__AUTH__CIRCUIT_BREAKER__PERCENTILE", "0.5");
        env::set_var("NOTE_SERVICE__NOTES__CREATE_NOTES_BATCH_SIZE", "7");
    }

    let config = load().expect("config should load with overrides");

    assert_eq!(config.server.port, 9090);
    assert_eq!(config.auth.circuit_breaker.record_length, 20);
    assert_eq!(config.auth.circuit_breaker.percentile, 0.5);
    assert_eq!(config.notes.create_notes_batch_size, 7);

    utils::clean_env_vars();
}

#[test]
#[serial]
fn test_env_selects_http_publisher() {
    utils::clean_env_vars();
    unsafe {
        env::set_var("NOTE_SERVICE__OUTBOX__PUBLISHER__KIND", "http");
        env::set_var("NOTE_SERVICE__OUTBOX__PUBLISHER__URL", "http://localhost:9000/events");
    }

    let config = load().expect("config should load");

    assert_eq!(config.outbox.publisher.kind, PublisherKind::Http);
    assert_eq!(
        config.outbox.publisher.url.as_deref(),
        Some("http://localhost:9000/events")
    );

    utils::clean_env_vars();
}

// =============================================================================
// Validation
// =============================================================================

#[test]
#[serial]
fn test_invalid_percentile_is_rejected() {
    utils::clean_env_vars();
    unsafe { env::set_var("NOTE_SERVICE__AUTH__CIRCUIT_BREAKER__PERCENTILE", "1.5") };

    let result = load();
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));

    utils::clean_env_vars();
}

#[test]
#[serial]
fn test_zero_batch_size_is_rejected() {
    utils::clean_env_vars();
    unsafe { env::set_var("NOTE_SERVICE__NOTES__CREATE_NOTES_BATCH_SIZE", "0") };

    assert!(matches!(load(), Err(ConfigError::ValidationError(_))));

    utils::clean_env_vars();
}

#[test]
#[serial]
fn test_http_publisher_without_url_is_rejected() {
    utils::clean_env_vars();
    unsafe { env::set_var("NOTE_SERVICE__OUTBOX__PUBLISHER__KIND", "http") };

    assert!(matches!(load(), Err(ConfigError::ValidationError(_))));

    utils::clean_env_vars();
}

#[test]
fn test_breaker_section_validation() {
    let config = CircuitBreakerConfig {
        record_length: 0,
        ..CircuitBreakerConfig::default()
    };
    assert!(config.validate().is_err());

    let config = CircuitBreakerConfig {
        recovery_requests: 0,
        ..CircuitBreakerConfig::default()
    };
    assert!(config.validate().is_err());

    assert!(CircuitBreakerConfig::default().validate().is_ok());
}
