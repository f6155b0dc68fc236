//! Intake adapters: raw third-party events to ask requests.
//!
//! Tips, cheers and channel-point redemptions arrive from outside as loosely
//! shaped payloads. This module turns each into an [`AskRequest`] (or drops
//! it) and nothing more; admission rules are applied by the engine.

use serde::Deserialize;
use tracing::debug;

use crate::model::AskRequest;

/// Default amount credited to a channel-point redemption ($1).
pub const DEFAULT_REDEMPTION_CENTS: u64 = 100;

#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Cents credited per bit.
    pub bits_to_cents: u32,
    /// Cents credited per redemption.
    pub redemption_cents: u64,
    /// Only redemptions of this reward are accepted (case-insensitive).
    pub reward_title: Option<String>,
    /// Drop redemptions that carry no viewer text.
    pub require_text: bool,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            bits_to_cents: 1,
            redemption_cents: DEFAULT_REDEMPTION_CENTS,
            reward_title: None,
            require_text: true,
        }
    }
}

/// An event from a paid-tier or redemption source.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceEvent {
    Tip {
        #[serde(default)]
        username: Option<String>,
        /// Dollars.
        #[serde(default)]
        amount: f64,
        #[serde(default)]
        message: Option<String>,
    },
    Cheer {
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        bits: u64,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Redemption {
        #[serde(default)]
        user_name: Option<String>,
        #[serde(default)]
        reward_title: Option<String>,
        #[serde(default)]
        user_input: Option<String>,
    },
}

impl IntakeConfig {
    /// Map a source event to an ask, or `None` if the event is ignored.
    pub fn to_ask(&self, event: &SourceEvent) -> Option<AskRequest> {
        match event {
            SourceEvent::Tip {
                username,
                amount,
                message,
            } => {
                let message = non_empty(message.as_deref())?;
                let cents = dollars_to_cents(*amount);
                Some(
                    AskRequest::new(message, "tips")
                        .submitter(username.as_deref().unwrap_or("Tipper"))
                        .amount_cents(cents),
                )
            }
            SourceEvent::Cheer {
                username,
                bits,
                message,
            } => {
                let message = non_empty(message.as_deref())?;
                let cents = bits.saturating_mul(u64::from(self.bits_to_cents));
                Some(
                    AskRequest::new(message, "bits")
                        .submitter(username.as_deref().unwrap_or("Cheerer"))
                        .amount_cents(cents),
                )
            }
            SourceEvent::Redemption {
                user_name,
                reward_title,
                user_input,
            } => {
                let title = reward_title.as_deref().unwrap_or("Channel Points").trim();
                let accepted = self
                    .reward_title
                    .as_deref()
                    .is_none_or(|wanted| title.eq_ignore_ascii_case(wanted.trim()));
                if !accepted {
                    debug!(title, "redemption ignored: title mismatch");
                    return None;
                }
                let text = match non_empty(user_input.as_deref()) {
                    Some(input) => input.to_string(),
                    None if self.require_text => {
                        debug!(title, "redemption ignored: no text");
                        return None;
                    }
                    None => format!("asks: {title}"),
                };
                Some(
                    AskRequest::new(text, "channel_points")
                        .submitter(user_name.as_deref().unwrap_or("Viewer"))
                        .amount_cents(self.redemption_cents),
                )
            }
        }
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn dollars_to_cents(amount: f64) -> u64 {
    if amount.is_finite() && amount > 0.0 {
        (amount * 100.0).round() as u64
    } else {
        0
    }
}
