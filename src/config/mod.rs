//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast on malformed values. Every knob has a
//! default; without an API key the pump answers with a standby placeholder.
//! Sensitive values wrapped in secrecy::SecretString to prevent log leaks.

pub mod secrets;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::admission::normalize::DEFAULT_MAX_CHARS;
use crate::admission::tier::DEFAULT_PRIORITY_MIN_CENTS;
use crate::engine::{EngineConfig, PumpConfig};
use crate::error::{Error, Result};
use crate::intake::{DEFAULT_REDEMPTION_CENTS, IntakeConfig};
use secrets::SecretString;

/// Smallest accepted question cap; keeps the `asks: ` marker intact.
pub const MIN_QUESTION_CHARS: usize = 16;

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub anthropic_api_key: Option<SecretString>,
    /// Required in `x-admin-token` for admin routes; unset disables them.
    pub admin_token: Option<SecretString>,
    pub model_standard: String,
    pub model_priority: String,
    pub answer_preamble: Option<String>,
    pub priority_tier_min_cents: u64,
    pub redemption_cents: u64,
    pub bits_to_cents: u32,
    pub reward_title: Option<String>,
    pub require_redemption_text: bool,
    pub max_question_chars: usize,
    pub dedup_window: Duration,
    pub pump_cooldown: Duration,
    pub generation_timeout: Duration,
    pub moderation_policy: Option<PathBuf>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    /// In production, systemd EnvironmentFile provides the vars.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        let max_question_chars = parsed(&var, "MAX_QUESTION_CHARS", DEFAULT_MAX_CHARS)?;
        if max_question_chars < MIN_QUESTION_CHARS {
            return Err(Error::Config(format!(
                "MAX_QUESTION_CHARS must be at least {MIN_QUESTION_CHARS}, got {max_question_chars}"
            )));
        }

        Ok(Self {
            port: parsed(&var, "PORT", 3000)?,
            data_dir: var("DATA_DIR").map_or_else(|| PathBuf::from("data"), PathBuf::from),
            anthropic_api_key: secrets::secret_from(var("ANTHROPIC_API_KEY")),
            admin_token: secrets::secret_from(var("ADMIN_TOKEN")),
            model_standard: var("MODEL_STANDARD")
                .unwrap_or_else(|| "claude-3-5-haiku-latest".to_string()),
            model_priority: var("MODEL_PRIORITY")
                .unwrap_or_else(|| "claude-sonnet-4-20250514".to_string()),
            answer_preamble: var("ANSWER_PREAMBLE"),
            priority_tier_min_cents: parsed(
                &var,
                "PRIORITY_TIER_MIN_CENTS",
                DEFAULT_PRIORITY_MIN_CENTS,
            )?,
            redemption_cents: parsed(&var, "FREE_TIER_MIN_CENTS", DEFAULT_REDEMPTION_CENTS)?,
            bits_to_cents: parsed(&var, "BITS_TO_CENTS", 1)?,
            reward_title: var("REWARD_TITLE"),
            require_redemption_text: parsed(&var, "REQUIRE_REDEMPTION_TEXT", true)?,
            max_question_chars,
            dedup_window: Duration::from_secs(parsed(&var, "DEDUP_WINDOW_SECS", 60)?),
            pump_cooldown: Duration::from_millis(parsed(&var, "PUMP_COOLDOWN_MS", 300)?),
            generation_timeout: Duration::from_secs(parsed(&var, "GENERATION_TIMEOUT_SECS", 30)?),
            moderation_policy: var("MODERATION_POLICY").map(PathBuf::from),
            otel_endpoint: var("OTEL_ENDPOINT"),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            priority_min_cents: self.priority_tier_min_cents,
            max_question_chars: self.max_question_chars,
            dedup_window: self.dedup_window,
            ..EngineConfig::default()
        }
    }

    pub fn pump_config(&self) -> PumpConfig {
        PumpConfig {
            cooldown: self.pump_cooldown,
            generation_timeout: self.generation_timeout,
            ..PumpConfig::default()
        }
    }

    pub fn intake_config(&self) -> IntakeConfig {
        IntakeConfig {
            bits_to_cents: self.bits_to_cents,
            redemption_cents: self.redemption_cents,
            reward_title: self.reward_title.clone(),
            require_text: self.require_redemption_text,
        }
    }
}

fn parsed<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{name}={raw:?} is invalid: {e}"))),
        None => Ok(default),
    }
}
