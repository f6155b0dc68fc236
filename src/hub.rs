//! Notification hub: fan-out of queue and answer events to observers.
//!
//! Observers are registered output channels. Delivery is fire-and-forget:
//! each observer receives notices in send order, and an observer whose
//! receiver has gone away is pruned on the next failed send.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::model::{QueueSnapshot, Tier, WorkId};

/// A broadcast event, as seen by observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Notice {
    QueueState {
        items: QueueSnapshot,
    },
    AnswerReady {
        id: WorkId,
        submitter: String,
        text: String,
        answer: String,
        tier: Tier,
    },
    ModerationBlock {
        submitter: String,
        text: String,
    },
    /// Ask overlays to replay the last answer.
    Replay,
}

impl Notice {
    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Notice::QueueState { .. } => "queue-state",
            Notice::AnswerReady { .. } => "answer-ready",
            Notice::ModerationBlock { .. } => "moderation-block",
            Notice::Replay => "replay",
        }
    }
}

/// Registry handle for one observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// The receiving end of an observer registration.
#[derive(Debug)]
pub struct Subscription {
    pub id: ObserverId,
    pub rx: mpsc::UnboundedReceiver<Notice>,
}

#[derive(Debug, Default)]
pub struct Hub {
    observers: Mutex<HashMap<ObserverId, mpsc::UnboundedSender<Notice>>>,
    next_id: AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> Subscription {
        self.subscribe_with(None)
    }

    /// Register a new observer, delivering `initial` to it before any
    /// later broadcast.
    pub fn subscribe_with(&self, initial: Option<Notice>) -> Subscription {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(notice) = initial {
            let _ = tx.send(notice);
        }
        let mut observers = self.lock();
        observers.insert(id, tx);
        debug!(observer = %id, total = observers.len(), "observer subscribed");
        Subscription { id, rx }
    }

    /// Remove an observer. False if it was already gone.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Send a notice to every observer. Returns how many received it.
    pub fn broadcast(&self, notice: Notice) -> usize {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|_, tx| tx.send(notice.clone()).is_ok());
        let delivered = observers.len();
        if delivered < before {
            debug!(
                pruned = before - delivered,
                kind = notice.kind(),
                "pruned disconnected observers"
            );
        }
        delivered
    }

    pub fn observer_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ObserverId, mpsc::UnboundedSender<Notice>>> {
        // A panic while holding the lock cannot leave the map inconsistent.
        self.observers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
