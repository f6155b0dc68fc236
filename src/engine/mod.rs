//! Core engine. The public API for submitting and managing asks.
//!
//! The engine owns the queue, the answer history and the notification hub.
//! Every queue mutation goes through here, runs under one lock, and is
//! followed by a queue-state broadcast published under that same lock so
//! observers see snapshots in mutation order.

pub mod pump;

pub use pump::{AnswerPump, CycleOutcome, PumpConfig};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::admission::dedup::DEFAULT_WINDOW_SECS;
use crate::admission::normalize::DEFAULT_MAX_CHARS;
use crate::admission::tier::DEFAULT_PRIORITY_MIN_CENTS;
use crate::admission::{Deduplicator, ModerationGate, ModerationPolicy, TierClassifier, normalize};
use crate::error::{Error, Result};
use crate::generate::GenerationError;
use crate::hub::{Hub, Notice, Subscription};
use crate::model::*;
use crate::queue::{DEFAULT_RETAIN, PriorityQueue};
use crate::storage::Storage;
use crate::telemetry::metrics;

/// Default number of answers kept in the history.
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

/// Admission and retention settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum amount for the priority tier.
    pub priority_min_cents: u64,
    /// Cap on normalized question length, in characters.
    pub max_question_chars: usize,
    /// Trailing window for duplicate suppression.
    pub dedup_window: Duration,
    /// Terminal items kept for lookups.
    pub retain: usize,
    /// Answers kept in the history.
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            priority_min_cents: DEFAULT_PRIORITY_MIN_CENTS,
            max_question_chars: DEFAULT_MAX_CHARS,
            dedup_window: Duration::from_secs(DEFAULT_WINDOW_SECS as u64),
            retain: DEFAULT_RETAIN,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// What happened when an ask was submitted.
#[derive(Debug, Clone)]
pub enum SubmitResult {
    /// New work item created and queued.
    Created(WorkItem),
    /// Same submitter and text already queued within the window; the
    /// existing item is returned instead.
    Duplicate(WorkItem),
}

impl SubmitResult {
    pub fn item(&self) -> &WorkItem {
        match self {
            SubmitResult::Created(item) | SubmitResult::Duplicate(item) => item,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, SubmitResult::Duplicate(_))
    }
}

/// The ask engine. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    queue: Mutex<PriorityQueue>,
    history: Mutex<VecDeque<AnswerRecord>>,
    hub: Hub,
    wake: Notify,
    gate: ModerationGate,
    tiers: TierClassifier,
    dedup: Deduplicator,
    config: EngineConfig,
    storage: Option<Storage>,
    /// Bumped under the queue lock on every persisted mutation.
    revision: AtomicU64,
}

/// Queued items captured under the queue lock, written after it is released.
struct PendingSnapshot {
    revision: u64,
    items: Vec<WorkItem>,
}

impl Engine {
    /// Create an engine with default settings and no persistence (for testing).
    pub fn in_memory() -> Result<Self> {
        let gate = ModerationGate::new(&ModerationPolicy::default())?;
        Ok(Self::new(EngineConfig::default(), gate))
    }

    /// Create an engine without persistence.
    pub fn new(config: EngineConfig, gate: ModerationGate) -> Self {
        Self::build(config, gate, None)
    }

    /// Create an engine backed by storage, restoring the queued items and
    /// answer history left by the previous run. Anything that cannot be
    /// read back is logged and skipped.
    pub fn open(config: EngineConfig, gate: ModerationGate, storage: Storage) -> Self {
        let pending = storage.load_pending().unwrap_or_else(|e| {
            warn!("could not restore queued asks, starting empty: {e}");
            Vec::new()
        });
        let history = storage.load_history().unwrap_or_else(|e| {
            warn!("could not restore answer history, starting empty: {e}");
            Vec::new()
        });
        let engine = Self::build(config, gate, Some(storage));

        {
            let mut queue = engine.lock_queue();
            let restored = queue.restore(pending);
            if restored > 0 {
                info!(restored, "restored queued asks");
            }
        }
        {
            let limit = engine.inner.config.history_limit;
            let mut records = engine.lock_history();
            records.extend(history);
            while records.len() > limit {
                records.pop_front();
            }
        }
        engine
    }

    fn build(config: EngineConfig, gate: ModerationGate, storage: Option<Storage>) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(PriorityQueue::new(config.retain)),
                history: Mutex::new(VecDeque::new()),
                hub: Hub::new(),
                wake: Notify::new(),
                gate,
                tiers: TierClassifier::new(config.priority_min_cents),
                dedup: Deduplicator::new(config.dedup_window),
                config,
                storage,
                revision: AtomicU64::new(0),
            }),
        }
    }

    /// Submit an ask: moderation, normalization, dedup, tiering, insertion.
    pub fn submit(&self, request: AskRequest) -> Result<SubmitResult> {
        self.submit_at(request, Utc::now())
    }

    /// [`Engine::submit`] with an explicit admission time.
    pub fn submit_at(&self, request: AskRequest, now: DateTime<Utc>) -> Result<SubmitResult> {
        let submitter = request.submitter_name().to_string();
        let origin = request.origin().to_string();

        let raw = request.text().trim();
        if raw.is_empty() {
            record_submission(&origin, "invalid");
            return Err(Error::InvalidInput("missing question".to_string()));
        }

        if self.inner.gate.should_block(raw) {
            warn!(%submitter, %origin, "ask blocked by moderation");
            record_submission(&origin, "blocked");
            self.inner.hub.broadcast(Notice::ModerationBlock {
                submitter,
                text: raw.to_string(),
            });
            return Err(Error::Blocked);
        }

        let text = normalize(raw, self.inner.config.max_question_chars);
        let mut queue = self.lock_queue();

        if let Some(existing) = self
            .inner
            .dedup
            .find_duplicate(&queue, &submitter, &text, now)
        {
            debug!(id = %existing.id, %submitter, "duplicate ask suppressed");
            record_submission(&origin, "duplicate");
            return Ok(SubmitResult::Duplicate(existing.clone()));
        }

        let tier = self.inner.tiers.classify(request.cents());
        let item = queue.insert(&submitter, &text, request.cents(), tier, &origin, now);
        info!(id = %item.id, %submitter, %tier, %origin, "ask queued");
        record_submission(&origin, "created");

        self.publish(&queue);
        let snapshot = self.snapshot_pending(&queue);
        drop(queue);

        self.persist(snapshot);
        self.inner.wake.notify_one();
        Ok(SubmitResult::Created(item))
    }

    /// Queued items in answer order.
    pub fn list_queue(&self) -> QueueSnapshot {
        self.lock_queue().snapshot()
    }

    /// Look up an item, active or recently retired.
    pub fn get(&self, id: WorkId) -> Option<WorkItem> {
        self.lock_queue().get(id).cloned()
    }

    /// The item currently being answered, if any.
    pub fn answering(&self) -> Option<WorkItem> {
        self.lock_queue().answering().cloned()
    }

    /// Withdraw a queued ask.
    pub fn withdraw(&self, id: WorkId) -> Result<()> {
        let mut queue = self.lock_queue();
        if !queue.withdraw(id) {
            return Err(Error::NotFound(id));
        }
        info!(%id, "ask withdrawn");
        self.publish(&queue);
        let snapshot = self.snapshot_pending(&queue);
        drop(queue);

        self.persist(snapshot);
        Ok(())
    }

    /// Move a queued ask to the front of the line.
    pub fn promote(&self, id: WorkId) -> Result<()> {
        let mut queue = self.lock_queue();
        if !queue.promote(id) {
            return Err(Error::NotFound(id));
        }
        info!(%id, "ask promoted");
        self.publish(&queue);
        let snapshot = self.snapshot_pending(&queue);
        drop(queue);

        self.persist(snapshot);
        self.inner.wake.notify_one();
        Ok(())
    }

    /// Answered asks, oldest first.
    pub fn history(&self) -> Vec<AnswerRecord> {
        self.lock_history().iter().cloned().collect()
    }

    /// Register an observer, primed with the current queue state.
    pub fn subscribe(&self) -> Subscription {
        let queue = self.lock_queue();
        self.inner.hub.subscribe_with(Some(Notice::QueueState {
            items: queue.snapshot(),
        }))
    }

    /// Ask every observer to replay the last answer.
    pub fn replay(&self) -> usize {
        let delivered = self.inner.hub.broadcast(Notice::Replay);
        info!(delivered, "replay requested");
        delivered
    }

    pub fn hub(&self) -> &Hub {
        &self.inner.hub
    }

    /// Resolves once new work may be available.
    pub async fn work_ready(&self) {
        self.inner.wake.notified().await;
    }

    /// Take the next eligible item and mark it answering.
    pub(crate) fn claim_next(&self) -> Result<Option<WorkItem>> {
        let mut queue = self.lock_queue();
        let Some(id) = queue.next_eligible().map(|item| item.id) else {
            return Ok(None);
        };
        let item = queue.begin_answering(id)?;
        self.publish(&queue);
        let snapshot = self.snapshot_pending(&queue);
        drop(queue);

        self.persist(snapshot);
        Ok(Some(item))
    }

    /// Deliver an answer and retire the item as answered.
    pub(crate) fn complete(&self, item: &WorkItem, answer: String) -> Result<()> {
        self.inner.hub.broadcast(Notice::AnswerReady {
            id: item.id,
            submitter: item.submitter.clone(),
            text: item.text.clone(),
            answer: answer.clone(),
            tier: item.tier,
        });

        {
            let mut queue = self.lock_queue();
            queue.mark_answered(item.id)?;
            self.publish(&queue);
        }

        let record = AnswerRecord {
            id: item.id,
            submitter: item.submitter.clone(),
            text: item.text.clone(),
            answer,
            tier: item.tier,
            answered_at: Utc::now(),
        };
        let limit = self.inner.config.history_limit;
        {
            let mut history = self.lock_history();
            history.push_back(record.clone());
            while history.len() > limit {
                history.pop_front();
            }
        }

        if let Some(storage) = &self.inner.storage {
            if let Err(e) = storage.append_history(&record, limit) {
                warn!("failed to save answer history: {e}");
            }
        }
        Ok(())
    }

    /// Retire an item whose generation failed.
    pub(crate) fn fail(&self, item: &WorkItem, error: &GenerationError) -> Result<()> {
        let mut queue = self.lock_queue();
        queue.mark_blocked(item.id)?;
        debug!(id = %item.id, %error, "ask blocked after generation failure");
        self.publish(&queue);
        Ok(())
    }

    fn publish(&self, queue: &PriorityQueue) {
        self.inner.hub.broadcast(Notice::QueueState {
            items: queue.snapshot(),
        });
    }

    /// Capture the queued items for storage. Must run under the queue lock
    /// so revisions follow mutation order.
    fn snapshot_pending(&self, queue: &PriorityQueue) -> Option<PendingSnapshot> {
        self.inner.storage.as_ref()?;
        Some(PendingSnapshot {
            revision: self.inner.revision.fetch_add(1, Ordering::Relaxed) + 1,
            items: queue.queued().cloned().collect(),
        })
    }

    fn persist(&self, snapshot: Option<PendingSnapshot>) {
        let (Some(storage), Some(snapshot)) = (&self.inner.storage, snapshot) else {
            return;
        };
        if let Err(e) = storage.save_pending(snapshot.revision, &snapshot.items) {
            warn!("failed to save pending queue: {e}");
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, PriorityQueue> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_history(&self) -> MutexGuard<'_, VecDeque<AnswerRecord>> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn record_submission(origin: &str, result: &'static str) {
    metrics::asks_submitted().add(
        1,
        &[
            KeyValue::new("origin", origin.to_string()),
            KeyValue::new("result", result),
        ],
    );
}
