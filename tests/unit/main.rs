use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use bearer_token_manager::errors::Error;
use bearer_token_manager::telemetry::fetch::{FetchPath, FetchTelemetry};
use bearer_token_manager::token::PacingPolicy;
use bearer_token_manager::{ConfigLocation, TokenManagerConfig};

#[test]
fn default_policy_matches_protocol_constants() {
    let policy = PacingPolicy::default();
    assert_eq!(policy.claim_window_secs, 60);
    assert_eq!(policy.poll_interval, Duration::from_millis(500));
    assert_eq!(policy.refresh_backoff_secs, 60);
    assert_eq!(policy.refresh_at(1_000, 100), 980);
}

#[test]
fn refresh_buffer_rounds_towards_earlier_refresh() {
    let policy = PacingPolicy::default();
    assert_eq!(policy.refresh_at(1_000, 101), 979);
    assert_eq!(policy.refresh_at(5_000, 3_600), 4_280);
}

#[test]
fn refresh_at_saturates_on_extreme_inputs() {
    let policy = PacingPolicy::default();
    assert_eq!(policy.refresh_at(i64::MIN + 5, i64::MAX), i64::MIN);
    let late = policy.refresh_at(i64::MAX, i64::MAX);
    assert!(late > 0 && late < i64::MAX);
    assert_eq!(policy.refresh_at(1_000, i64::MIN), 1_000);
}

#[test]
fn fetch_telemetry_tags_each_attempt() {
    let paced = FetchTelemetry::new(FetchPath::Paced);
    let refresh = FetchTelemetry::new(FetchPath::Refresh);
    assert_eq!(paced.path(), FetchPath::Paced);
    assert_eq!(refresh.path(), FetchPath::Refresh);
    assert!(!paced.attempt_id().is_nil());
    assert_ne!(paced.attempt_id(), refresh.attempt_id());
}

#[test]
fn policy_rejects_out_of_range_values() {
    let cases = [
        PacingPolicy::new(0, Duration::from_millis(500), 60, 0.2),
        PacingPolicy::new(60, Duration::ZERO, 60, 0.2),
        PacingPolicy::new(60, Duration::from_millis(500), -1, 0.2),
        PacingPolicy::new(60, Duration::from_millis(500), 60, 1.0),
        PacingPolicy::new(60, Duration::from_millis(500), 60, 0.0),
    ];
    for case in cases {
        assert!(matches!(case, Err(Error::Config(_))), "{case:?}");
    }
}

#[test]
fn config_file_loads_with_defaults() {
    let mut path = PathBuf::from("target");
    path.push("test-config-unit-defaults.json");
    fs::create_dir_all("target").ok();
    fs::write(
        &path,
        r#"{ "url": "https://iam.example.com/identity/token", "token_field_name": "access_token" }"#,
    )
    .unwrap();

    let config =
        TokenManagerConfig::load(ConfigLocation::File(path.to_string_lossy().to_string()))
            .expect("config loads");
    assert_eq!(config.url, "https://iam.example.com/identity/token");
    assert_eq!(config.token_field_name, "access_token");
    assert!(!config.disable_tls_verification);
    assert_eq!(config.timeout(), Duration::from_secs(60));
}

#[test]
fn config_file_with_invalid_url_is_rejected() {
    let mut path = PathBuf::from("target");
    path.push("test-config-unit-bad-url.json");
    fs::create_dir_all("target").ok();
    fs::write(
        &path,
        r#"{ "url": "iam.example.com", "token_field_name": "access_token", "disable_tls_verification": true }"#,
    )
    .unwrap();

    let err = TokenManagerConfig::from_file(&path).expect_err("relative url");
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let err = TokenManagerConfig::from_file("target/does-not-exist.json").expect_err("missing");
    assert!(matches!(err, Error::Io(_)));
}
