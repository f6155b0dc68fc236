//! Admission pipeline: everything a submission passes through before it
//! enters the queue.
//!
//! moderation gate -> normalization -> deduplication -> tier classification.
//! All pieces are pure or read-only over the queue; the engine runs them in
//! order under the queue lock.

pub mod dedup;
pub mod moderation;
pub mod normalize;
pub mod tier;

pub use dedup::Deduplicator;
pub use moderation::{ModerationGate, ModerationPolicy};
pub use normalize::{DEFAULT_MAX_CHARS, normalize};
pub use tier::TierClassifier;
