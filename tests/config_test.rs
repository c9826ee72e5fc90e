//! Tests for configuration parsing and validation

use prometheus_booking::config::{ActingUserPolicy, EngineConfig};
use prometheus_booking::core::EngineError;
use prometheus_booking::engine::BookingEngine;

#[test]
fn test_config_from_json() {
    let json = r#"{
        "ticket_count": 1000,
        "user_count": 50,
        "batch_size": 5,
        "worker_count": 4,
        "queue_capacity": 8,
        "acting_user": "resample",
        "seed": 7
    }"#;

    let config = EngineConfig::from_json_str(json).unwrap();
    assert_eq!(config.ticket_count, 1000);
    assert_eq!(config.user_count, 50);
    assert_eq!(config.worker_count, 4);
    assert_eq!(config.queue_capacity, 8);
    assert_eq!(config.acting_user, ActingUserPolicy::Resample);
    assert_eq!(config.seed, Some(7));
    assert_eq!(config.attempts_per_user, 3);
}

#[test]
fn test_config_from_json_rejects_zero() {
    let err = EngineConfig::from_json_str(r#"{ "worker_count": 0 }"#).unwrap_err();
    assert_eq!(err, "worker_count must be greater than 0");
}

#[test]
fn test_config_from_json_rejects_negative() {
    let err = EngineConfig::from_json_str(r#"{ "ticket_count": -1 }"#).unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_config_from_json_rejects_unknown_policy() {
    assert!(EngineConfig::from_json_str(r#"{ "acting_user": "anyone" }"#).is_err());
}

#[test]
fn test_config_roundtrip_json() {
    let config = EngineConfig::new()
        .with_ticket_count(10)
        .with_acting_user(ActingUserPolicy::Resample);
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_policy_from_str() {
    assert_eq!("owner".parse::<ActingUserPolicy>().unwrap(), ActingUserPolicy::Owner);
    assert_eq!(" RESAMPLE ".parse::<ActingUserPolicy>().unwrap(), ActingUserPolicy::Resample);
    assert!("random".parse::<ActingUserPolicy>().is_err());
}

#[test]
fn test_engine_rejects_misuse_before_dispatch() {
    for config in [
        EngineConfig::new().with_ticket_count(0),
        EngineConfig::new().with_user_count(0),
        EngineConfig::new().with_queue_capacity(0),
    ] {
        assert!(matches!(
            BookingEngine::new(config),
            Err(EngineError::InvalidConfig(_))
        ));
    }
}
