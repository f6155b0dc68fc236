//! The answer-generation collaborator, as seen by the pump.
//!
//! The pump only knows the [`Generator`] trait: hand over a question, get an
//! answer string back or a [`GenerationError`]. Concrete backends live in
//! [`crate::llm`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Tier, WorkItem};

/// Placeholder answer used when no generation backend is configured.
pub const STANDBY_ANSWER: &str = "Standing by…";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// What the generator is asked to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub submitter: String,
    pub text: String,
    pub tier: Tier,
}

impl From<&WorkItem> for GenerationRequest {
    fn from(item: &WorkItem) -> Self {
        Self {
            submitter: item.submitter.clone(),
            text: item.text.clone(),
            tier: item.tier,
        }
    }
}

impl GenerationRequest {
    /// The user turn sent to a chat model.
    pub fn user_prompt(&self) -> String {
        format!(
            "User: {}\nQuestion: {}\nAnswer concisely.",
            self.submitter, self.text
        )
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer. Higher tiers may take a costlier path.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Answers every question with [`STANDBY_ANSWER`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandbyGenerator;

#[async_trait]
impl Generator for StandbyGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Ok(STANDBY_ANSWER.to_string())
    }
}
