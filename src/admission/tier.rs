//! Tier classification by monetary weight.

use crate::model::Tier;

/// Default threshold for the priority tier ($3).
pub const DEFAULT_PRIORITY_MIN_CENTS: u64 = 300;

/// Maps a submission's amount to its tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierClassifier {
    pub priority_min_cents: u64,
}

impl TierClassifier {
    pub fn new(priority_min_cents: u64) -> Self {
        Self { priority_min_cents }
    }

    pub fn classify(&self, amount_cents: u64) -> Tier {
        if amount_cents >= self.priority_min_cents {
            Tier::Priority
        } else {
            Tier::Standard
        }
    }
}

impl Default for TierClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY_MIN_CENTS)
    }
}
