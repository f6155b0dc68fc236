//! The priority queue: sole owner of work item ordering and status.
//!
//! Queued items sort by `(priority_rank desc, created_at asc, seq asc)`.
//! Items that reach a terminal status leave the active list and are kept in
//! a bounded retired list for lookups.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{QueueEntry, QueueSnapshot, Status, Tier, WorkId, WorkItem};

/// Default number of terminal items kept for lookups.
pub const DEFAULT_RETAIN: usize = 500;

#[derive(Debug)]
pub struct PriorityQueue {
    /// Queued and answering items, in sort order.
    items: Vec<WorkItem>,
    /// Terminal items, oldest first.
    retired: VecDeque<WorkItem>,
    retain: usize,
    last_stamp: i64,
    next_seq: u64,
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new(DEFAULT_RETAIN)
    }
}

impl PriorityQueue {
    pub fn new(retain: usize) -> Self {
        Self {
            items: Vec::new(),
            retired: VecDeque::new(),
            retain,
            last_stamp: i64::MIN,
            next_seq: 0,
        }
    }

    /// Create and enqueue a new item. The tier must already be classified.
    pub fn insert(
        &mut self,
        submitter: &str,
        text: &str,
        amount_cents: u64,
        tier: Tier,
        origin: &str,
        now: DateTime<Utc>,
    ) -> WorkItem {
        let item = WorkItem {
            id: WorkId::new(),
            submitter: submitter.to_string(),
            text: text.to_string(),
            source_amount_cents: amount_cents,
            tier,
            priority_rank: tier.rank(),
            status: Status::Queued,
            origin: origin.to_string(),
            created_at: self.next_stamp(now),
            submitted_at: now,
            seq: self.take_seq(),
        };
        self.items.push(item.clone());
        self.resort();
        item
    }

    /// Re-enqueue items recovered after a restart. Ids, tiers and stamps are
    /// kept; anything not queued is ignored.
    pub fn restore(&mut self, items: impl IntoIterator<Item = WorkItem>) -> usize {
        let mut restored = 0;
        for mut item in items {
            if item.status != Status::Queued || self.get(item.id).is_some() {
                continue;
            }
            item.priority_rank = item.tier.rank();
            item.seq = self.take_seq();
            self.last_stamp = self.last_stamp.max(item.created_at);
            self.items.push(item);
            restored += 1;
        }
        self.resort();
        restored
    }

    /// Withdraw a queued item. False if unknown or no longer queued.
    pub fn withdraw(&mut self, id: WorkId) -> bool {
        self.transition(id, Status::Queued, Status::Stopped).is_ok()
    }

    /// Move a queued item to the front of the line and into the priority
    /// tier. False if unknown or no longer queued.
    pub fn promote(&mut self, id: WorkId) -> bool {
        let Some(min_stamp) = self.queued().map(|item| item.created_at).min() else {
            return false;
        };
        let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.id == id && item.status == Status::Queued)
        else {
            return false;
        };
        item.tier = Tier::Priority;
        item.priority_rank = Tier::Priority.rank();
        item.created_at = min_stamp.saturating_sub(1);
        self.resort();
        true
    }

    /// The item the pump should take next.
    pub fn next_eligible(&self) -> Option<&WorkItem> {
        self.queued().next()
    }

    /// The item currently held by the pump, if any.
    pub fn answering(&self) -> Option<&WorkItem> {
        self.items
            .iter()
            .find(|item| item.status == Status::Answering)
    }

    pub fn begin_answering(&mut self, id: WorkId) -> Result<WorkItem> {
        if let Some(current) = self.answering() {
            return Err(Error::AlreadyAnswering(current.id));
        }
        self.transition(id, Status::Queued, Status::Answering)
    }

    pub fn mark_answered(&mut self, id: WorkId) -> Result<WorkItem> {
        self.transition(id, Status::Answering, Status::Answered)
    }

    pub fn mark_blocked(&mut self, id: WorkId) -> Result<WorkItem> {
        self.transition(id, Status::Answering, Status::Blocked)
    }

    /// Queued items in sort order, projected for observers.
    pub fn snapshot(&self) -> QueueSnapshot {
        self.queued().map(QueueEntry::from).collect()
    }

    /// Queued items in sort order.
    pub fn queued(&self) -> impl Iterator<Item = &WorkItem> {
        self.items
            .iter()
            .filter(|item| item.status == Status::Queued)
    }

    /// Queued and answering items.
    pub fn active(&self) -> impl Iterator<Item = &WorkItem> {
        self.items.iter()
    }

    /// Recently retired items, oldest first.
    pub fn retired(&self) -> impl Iterator<Item = &WorkItem> {
        self.retired.iter()
    }

    pub fn get(&self, id: WorkId) -> Option<&WorkItem> {
        self.items
            .iter()
            .chain(self.retired.iter())
            .find(|item| item.id == id)
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.queued().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn transition(&mut self, id: WorkId, from: Status, to: Status) -> Result<WorkItem> {
        let Some(pos) = self.items.iter().position(|item| item.id == id) else {
            return match self.retired.iter().find(|item| item.id == id) {
                Some(item) => Err(Error::InvalidTransition {
                    id,
                    from: item.status,
                    to,
                }),
                None => Err(Error::NotFound(id)),
            };
        };

        let current = self.items[pos].status;
        if current != from || !current.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                id,
                from: current,
                to,
            });
        }

        if to.is_terminal() {
            let mut item = self.items.remove(pos);
            item.status = to;
            self.retire(item.clone());
            Ok(item)
        } else {
            self.items[pos].status = to;
            let item = self.items[pos].clone();
            self.resort();
            Ok(item)
        }
    }

    fn retire(&mut self, item: WorkItem) {
        self.retired.push_back(item);
        while self.retired.len() > self.retain {
            self.retired.pop_front();
        }
    }

    fn resort(&mut self) {
        self.items.sort_by_key(WorkItem::sort_key);
    }

    /// Monotonic ordering stamp in milliseconds.
    fn next_stamp(&mut self, now: DateTime<Utc>) -> i64 {
        self.last_stamp = self.last_stamp.max(now.timestamp_millis());
        self.last_stamp
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
