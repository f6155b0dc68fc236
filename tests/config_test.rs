//! Integration tests for environment configuration.

use std::collections::HashMap;
use std::time::Duration;

use askq::config::Config;
use askq::config::secrets::ExposeSecret;
use askq::error::Error;
use askq::model::Tier;

fn config_from(pairs: &[(&str, &str)]) -> askq::error::Result<Config> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_vars(|name| vars.get(name).cloned())
}

#[test]
fn defaults_apply_when_nothing_is_set() {
    let config = config_from(&[]).unwrap();

    assert_eq!(config.port, 3000);
    assert!(config.anthropic_api_key.is_none());
    assert!(config.admin_token.is_none());
    assert_eq!(config.priority_tier_min_cents, 300);
    assert_eq!(config.redemption_cents, 100);
    assert_eq!(config.max_question_chars, 280);
    assert_eq!(config.dedup_window, Duration::from_secs(60));
    assert_eq!(config.pump_cooldown, Duration::from_millis(300));
    assert_eq!(config.generation_timeout, Duration::from_secs(30));
    assert!(config.require_redemption_text);
    assert_eq!(config.log_level, "info");
}

#[test]
fn values_are_parsed_and_propagated() {
    let config = config_from(&[
        ("PORT", "8080"),
        ("ANTHROPIC_API_KEY", "sk-test-key"),
        ("ADMIN_TOKEN", "mod-secret"),
        ("PRIORITY_TIER_MIN_CENTS", "500"),
        ("FREE_TIER_MIN_CENTS", "25"),
        ("BITS_TO_CENTS", "2"),
        ("REWARD_TITLE", "Ask the streamer"),
        ("REQUIRE_REDEMPTION_TEXT", "false"),
        ("DEDUP_WINDOW_SECS", "10"),
        ("PUMP_COOLDOWN_MS", "50"),
    ])
    .unwrap();

    assert_eq!(config.port, 8080);
    assert!(config.anthropic_api_key.is_some());
    assert_eq!(
        config.admin_token.as_ref().map(|t| t.expose_secret().to_string()),
        Some("mod-secret".to_string())
    );

    let engine = config.engine_config();
    assert_eq!(engine.priority_min_cents, 500);
    assert_eq!(engine.dedup_window, Duration::from_secs(10));

    assert_eq!(config.pump_config().cooldown, Duration::from_millis(50));

    let intake = config.intake_config();
    assert_eq!(intake.bits_to_cents, 2);
    assert_eq!(intake.redemption_cents, 25);
    assert_eq!(intake.reward_title.as_deref(), Some("Ask the streamer"));
    assert!(!intake.require_text);

    let classifier = askq::admission::TierClassifier::new(engine.priority_min_cents);
    assert_eq!(classifier.classify(400), Tier::Standard);
}

#[test]
fn blank_values_count_as_unset() {
    let config = config_from(&[("ANTHROPIC_API_KEY", "   "), ("PORT", "")]).unwrap();
    assert!(config.anthropic_api_key.is_none());
    assert_eq!(config.port, 3000);
}

#[test]
fn malformed_number_is_a_config_error() {
    match config_from(&[("PORT", "eighty")]) {
        Err(Error::Config(msg)) => assert!(msg.contains("PORT")),
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn question_cap_has_a_floor() {
    assert!(matches!(
        config_from(&[("MAX_QUESTION_CHARS", "4")]),
        Err(Error::Config(_))
    ));
    assert_eq!(
        config_from(&[("MAX_QUESTION_CHARS", "16")])
            .unwrap()
            .max_question_chars,
        16
    );
}
