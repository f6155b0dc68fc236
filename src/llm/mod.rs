//! LLM-backed answer generation via rig-core.
//!
//! Provides a helper to create an Anthropic [`Client`] from a
//! [`SecretString`]-wrapped API key, and [`RigGenerator`], which picks a
//! [`GenerationProfile`] per tier and prompts a one-shot agent with it.
//!
//! [`Client`]: rig::providers::anthropic::Client
//! [`SecretString`]: secrecy::SecretString

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use tracing::{Instrument, debug};

use crate::config::secrets::{ExposeSecret, SecretString};
use crate::generate::{GenerationError, GenerationRequest, Generator};
use crate::model::Tier;
use crate::telemetry::genai::start_chat_span;

/// Default system preamble for answers.
pub const DEFAULT_PREAMBLE: &str = "You are a warm, street-smart, respectful mentor answering \
viewer questions live on stream. PG-13, no slurs. Short, punchy answers: one to three short \
paragraphs or tight bullets. For games, give clear actionable steps. For medical, legal or \
financial topics, be careful and suggest professional help.";

/// Create an Anthropic client from a secret API key.
///
/// # Errors
/// Returns an error if the underlying HTTP client cannot be constructed.
pub fn anthropic_client(
    api_key: &SecretString,
) -> Result<rig::providers::anthropic::Client, rig::http_client::Error> {
    rig::providers::anthropic::Client::new(api_key.expose_secret())
}

/// Model and sampling settings for one tier.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationProfile {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl GenerationProfile {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.6,
            max_tokens: 400,
        }
    }
}

/// One profile per tier.
#[derive(Debug, Clone, PartialEq)]
pub struct TierProfiles {
    pub standard: GenerationProfile,
    pub priority: GenerationProfile,
}

impl TierProfiles {
    pub fn for_tier(&self, tier: Tier) -> &GenerationProfile {
        match tier {
            Tier::Standard => &self.standard,
            Tier::Priority => &self.priority,
        }
    }
}

/// Generator backed by an Anthropic chat model.
pub struct RigGenerator {
    client: rig::providers::anthropic::Client,
    preamble: String,
    profiles: TierProfiles,
}

impl RigGenerator {
    pub fn new(
        client: rig::providers::anthropic::Client,
        standard: GenerationProfile,
        priority: GenerationProfile,
    ) -> Self {
        Self {
            client,
            preamble: DEFAULT_PREAMBLE.to_string(),
            profiles: TierProfiles { standard, priority },
        }
    }

    pub fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// The profile used for a tier.
    pub fn profile(&self, tier: Tier) -> &GenerationProfile {
        self.profiles.for_tier(tier)
    }
}

#[async_trait]
impl Generator for RigGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let profile = self.profile(request.tier);
        let span = start_chat_span(&profile.model, "anthropic");

        async {
            let agent = self
                .client
                .agent(profile.model.as_str())
                .preamble(&self.preamble)
                .temperature(profile.temperature)
                .max_tokens(profile.max_tokens)
                .build();

            let answer = agent
                .prompt(request.user_prompt())
                .await
                .map_err(|e| GenerationError::Upstream(e.to_string()))?;

            let answer = answer.trim();
            if answer.is_empty() {
                return Err(GenerationError::Malformed("empty answer".to_string()));
            }
            debug!(model = %profile.model, chars = answer.len(), "answer generated");
            Ok(answer.to_string())
        }
        .instrument(span)
        .await
    }
}
