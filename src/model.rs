//! Core data model.
//!
//! A work item is one viewer question waiting for (or holding) an answer. It
//! has identity, attribution, a monetary weight that fixes its tier, and a
//! lifecycle status owned by the priority queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display name used when a submission carries no submitter.
pub const DEFAULT_SUBMITTER: &str = "Viewer";

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// A unit of scheduled answer work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    /// Unique identifier. Never reused.
    pub id: WorkId,

    /// Who the question is attributed to.
    pub submitter: String,

    /// Normalized question text.
    pub text: String,

    /// Monetary weight backing the submission. Zero for unpaid asks.
    pub source_amount_cents: u64,

    /// Fixed at insertion; only an explicit promotion changes it.
    pub tier: Tier,

    /// Ordering key, kept equal to `tier.rank()`.
    pub priority_rank: u8,

    pub status: Status,

    /// Provenance tag (e.g. "mod", "tips", "channel_points"). Informational.
    pub origin: String,

    /// Ordering stamp in milliseconds. FIFO key within a tier; promotion
    /// moves it below the current minimum.
    pub created_at: i64,

    /// Wall-clock admission time. Immutable; used by the deduplicator.
    pub submitted_at: DateTime<Utc>,

    /// Insertion sequence, the final tie-break when stamps collide.
    #[serde(default)]
    pub seq: u64,
}

impl WorkItem {
    /// Sort key for queued items: higher rank first, then older stamp, then
    /// insertion order.
    pub fn sort_key(&self) -> (std::cmp::Reverse<u8>, i64, u64) {
        (std::cmp::Reverse(self.priority_rank), self.created_at, self.seq)
    }
}

/// Newtype for work item IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkId(pub Uuid);

impl WorkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for WorkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for WorkId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for WorkId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Priority class derived from the monetary weight of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Standard,
    Priority,
}

impl Tier {
    /// Ordering rank: 1 for priority, 0 otherwise.
    pub fn rank(self) -> u8 {
        match self {
            Tier::Standard => 0,
            Tier::Priority => 1,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tier::Standard => "standard",
            Tier::Priority => "priority",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Waiting for the pump.
    Queued,
    /// Held by the pump; the generator is running.
    Answering,
    /// Answer delivered. Terminal.
    Answered,
    /// Withdrawn before it was worked. Terminal.
    Stopped,
    /// Generation failed. Terminal.
    Blocked,
}

impl Status {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: Status) -> bool {
        use Status::*;
        matches!(
            (self, to),
            (Queued, Answering) | (Queued, Stopped) | (Answering, Answered) | (Answering, Blocked)
        )
    }

    /// Is this a terminal status?
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Answered | Status::Stopped | Status::Blocked)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Queued => "queued",
            Status::Answering => "answering",
            Status::Answered => "answered",
            Status::Stopped => "stopped",
            Status::Blocked => "blocked",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Observer-facing projection of one queued item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: WorkId,
    pub submitter: String,
    pub text: String,
    pub tier: Tier,
    pub priority_rank: u8,
    pub origin: String,
    pub amount_cents: u64,
    pub created_at: i64,
}

impl From<&WorkItem> for QueueEntry {
    fn from(item: &WorkItem) -> Self {
        Self {
            id: item.id,
            submitter: item.submitter.clone(),
            text: item.text.clone(),
            tier: item.tier,
            priority_rank: item.priority_rank,
            origin: item.origin.clone(),
            amount_cents: item.source_amount_cents,
            created_at: item.created_at,
        }
    }
}

/// Queued items in current sort order.
pub type QueueSnapshot = Vec<QueueEntry>;

// ---------------------------------------------------------------------------
// Answer Record
// ---------------------------------------------------------------------------

/// A resolved question, kept in the answer history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub id: WorkId,
    pub submitter: String,
    pub text: String,
    pub answer: String,
    pub tier: Tier,
    pub answered_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// An incoming ask, before admission. The engine's public API for submitting work.
#[derive(Debug, Clone)]
pub struct AskRequest {
    pub(crate) submitter: Option<String>,
    pub(crate) text: String,
    pub(crate) amount_cents: u64,
    pub(crate) origin: String,
}

impl AskRequest {
    pub fn new(text: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            submitter: None,
            text: text.into(),
            amount_cents: 0,
            origin: origin.into(),
        }
    }

    pub fn submitter(mut self, submitter: impl Into<String>) -> Self {
        let submitter = submitter.into();
        let trimmed = submitter.trim();
        self.submitter = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn amount_cents(mut self, cents: u64) -> Self {
        self.amount_cents = cents;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn cents(&self) -> u64 {
        self.amount_cents
    }

    /// Attributed submitter, falling back to the placeholder name.
    pub fn submitter_name(&self) -> &str {
        self.submitter.as_deref().unwrap_or(DEFAULT_SUBMITTER)
    }
}
