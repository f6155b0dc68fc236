//! Suppression of near-identical resubmissions.
//!
//! Guards against flaky client retries, not against a viewer deliberately
//! asking the same thing again later: only queued items submitted within the
//! trailing window count as duplicates.

use chrono::{DateTime, Duration, Utc};

use crate::model::{Status, WorkItem};
use crate::queue::PriorityQueue;

/// Default trailing window for duplicate detection.
pub const DEFAULT_WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone, Copy)]
pub struct Deduplicator {
    window: Duration,
}

impl Deduplicator {
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: Duration::from_std(window).unwrap_or_else(|_| Duration::days(36_500)),
        }
    }

    /// Find a queued item with the same submitter and normalized text
    /// admitted within the window ending at `now`.
    pub fn find_duplicate<'q>(
        &self,
        queue: &'q PriorityQueue,
        submitter: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Option<&'q WorkItem> {
        queue.active().find(|item| {
            item.status == Status::Queued
                && item.submitter == submitter
                && item.text == text
                && now.signed_duration_since(item.submitted_at) < self.window
        })
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self {
            window: Duration::seconds(DEFAULT_WINDOW_SECS),
        }
    }
}
