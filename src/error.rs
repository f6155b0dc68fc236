//! Error types for askq.

use thiserror::Error;

use crate::model::{Status, WorkId};

#[derive(Debug, Error)]
pub enum Error {
    /// Empty or malformed submission. Never enqueued.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Rejected by the moderation gate.
    #[error("blocked by moderation")]
    Blocked,

    #[error("work item not found: {0}")]
    NotFound(WorkId),

    #[error("invalid state transition for {id}: {from} -> {to}")]
    InvalidTransition { id: WorkId, from: Status, to: Status },

    /// Single-flight violation: another item already holds the pump.
    #[error("work item {0} is already answering")]
    AlreadyAnswering(WorkId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
