//! Integration tests for priority queue ordering and status transitions.

use askq::error::Error;
use askq::model::*;
use askq::queue::PriorityQueue;
use chrono::{Duration, TimeZone, Utc};

fn at(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn push(queue: &mut PriorityQueue, who: &str, tier: Tier, secs: i64) -> WorkItem {
    queue.insert(who, &format!("asks: from {who}"), 0, tier, "test", at(secs))
}

fn order(queue: &PriorityQueue) -> Vec<String> {
    queue.snapshot().into_iter().map(|e| e.submitter).collect()
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn insert_creates_queued_item() {
    let mut queue = PriorityQueue::default();
    let item = queue.insert("Alice", "asks: hi", 0, Tier::Standard, "mod", at(0));

    assert_eq!(item.status, Status::Queued);
    assert_eq!(item.tier, Tier::Standard);
    assert_eq!(item.priority_rank, 0);
    assert_eq!(item.origin, "mod");
    assert_eq!(queue.len(), 1);
}

#[test]
fn priority_tier_jumps_earlier_standard_items() {
    let mut queue = PriorityQueue::default();
    push(&mut queue, "alice", Tier::Standard, 0);
    push(&mut queue, "carol", Tier::Standard, 1);
    let bob = push(&mut queue, "bob", Tier::Priority, 2);

    assert_eq!(queue.next_eligible().unwrap().id, bob.id);
    assert_eq!(order(&queue), vec!["bob", "alice", "carol"]);
}

#[test]
fn fifo_within_a_tier() {
    let mut queue = PriorityQueue::default();
    for (i, who) in ["a", "b", "c", "d"].iter().enumerate() {
        push(&mut queue, who, Tier::Standard, i as i64);
    }
    push(&mut queue, "p1", Tier::Priority, 10);
    push(&mut queue, "p2", Tier::Priority, 11);

    assert_eq!(order(&queue), vec!["p1", "p2", "a", "b", "c", "d"]);
}

#[test]
fn identical_timestamps_keep_insertion_order() {
    let mut queue = PriorityQueue::default();
    for who in ["first", "second", "third"] {
        push(&mut queue, who, Tier::Standard, 0);
    }

    assert_eq!(order(&queue), vec!["first", "second", "third"]);
}

#[test]
fn clock_going_backwards_does_not_reorder_arrivals() {
    let mut queue = PriorityQueue::default();
    push(&mut queue, "early", Tier::Standard, 100);
    push(&mut queue, "late", Tier::Standard, 50);

    assert_eq!(order(&queue), vec!["early", "late"]);
}

#[test]
fn next_eligible_is_none_when_empty() {
    let queue = PriorityQueue::default();
    assert!(queue.next_eligible().is_none());
    assert!(queue.is_empty());
}

// ---------------------------------------------------------------------------
// Withdraw and promote
// ---------------------------------------------------------------------------

#[test]
fn withdraw_removes_from_snapshot_once() {
    let mut queue = PriorityQueue::default();
    push(&mut queue, "alice", Tier::Standard, 0);
    let bob = push(&mut queue, "bob", Tier::Priority, 1);

    assert!(queue.withdraw(bob.id));
    assert_eq!(order(&queue), vec!["alice"]);
    assert_eq!(queue.get(bob.id).unwrap().status, Status::Stopped);

    assert!(!queue.withdraw(bob.id));
    assert!(!queue.withdraw(WorkId::new()));
}

#[test]
fn promote_moves_standard_item_ahead_of_priority() {
    let mut queue = PriorityQueue::default();
    let alice = push(&mut queue, "alice", Tier::Standard, 0);
    push(&mut queue, "bob", Tier::Priority, 1);

    assert!(queue.promote(alice.id));

    let next = queue.next_eligible().unwrap();
    assert_eq!(next.id, alice.id);
    assert_eq!(next.tier, Tier::Priority);
    assert_eq!(next.priority_rank, 1);
    assert_eq!(order(&queue), vec!["alice", "bob"]);
}

#[test]
fn promote_goes_below_current_minimum_stamp() {
    let mut queue = PriorityQueue::default();
    let first = push(&mut queue, "a", Tier::Priority, 0);
    push(&mut queue, "b", Tier::Priority, 5);
    let last = push(&mut queue, "c", Tier::Standard, 9);

    assert!(queue.promote(last.id));

    let promoted = queue.get(last.id).unwrap();
    assert_eq!(promoted.created_at, first.created_at - 1);
    assert_eq!(order(&queue), vec!["c", "a", "b"]);
}

#[test]
fn promote_rejects_items_that_left_the_queue() {
    let mut queue = PriorityQueue::default();
    let a = push(&mut queue, "a", Tier::Standard, 0);
    let b = push(&mut queue, "b", Tier::Standard, 1);

    queue.begin_answering(a.id).unwrap();
    queue.withdraw(b.id);

    assert!(!queue.promote(a.id));
    assert!(!queue.promote(b.id));
    assert!(!queue.promote(WorkId::new()));
}

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

#[test]
fn happy_path_retires_item_as_answered() {
    let mut queue = PriorityQueue::default();
    let item = push(&mut queue, "a", Tier::Standard, 0);

    let answering = queue.begin_answering(item.id).unwrap();
    assert_eq!(answering.status, Status::Answering);
    assert!(queue.snapshot().is_empty());
    assert_eq!(queue.answering().unwrap().id, item.id);

    let answered = queue.mark_answered(item.id).unwrap();
    assert_eq!(answered.status, Status::Answered);
    assert!(queue.answering().is_none());
    assert_eq!(queue.get(item.id).unwrap().status, Status::Answered);
}

#[test]
fn failed_generation_retires_item_as_blocked() {
    let mut queue = PriorityQueue::default();
    let item = push(&mut queue, "a", Tier::Standard, 0);

    queue.begin_answering(item.id).unwrap();
    queue.mark_blocked(item.id).unwrap();

    assert_eq!(queue.get(item.id).unwrap().status, Status::Blocked);
}

#[test]
fn second_item_cannot_start_while_one_is_answering() {
    let mut queue = PriorityQueue::default();
    let a = push(&mut queue, "a", Tier::Standard, 0);
    let b = push(&mut queue, "b", Tier::Standard, 1);

    queue.begin_answering(a.id).unwrap();

    match queue.begin_answering(b.id) {
        Err(Error::AlreadyAnswering(id)) => assert_eq!(id, a.id),
        other => panic!("expected AlreadyAnswering, got {other:?}"),
    }
    assert_eq!(queue.active().filter(|i| i.status == Status::Answering).count(), 1);
}

#[test]
fn transitions_from_wrong_state_are_errors() {
    let mut queue = PriorityQueue::default();
    let item = push(&mut queue, "a", Tier::Standard, 0);

    assert!(matches!(
        queue.mark_answered(item.id),
        Err(Error::InvalidTransition {
            from: Status::Queued,
            to: Status::Answered,
            ..
        })
    ));

    queue.withdraw(item.id);
    assert!(matches!(
        queue.begin_answering(item.id),
        Err(Error::InvalidTransition {
            from: Status::Stopped,
            ..
        })
    ));
    assert!(matches!(
        queue.mark_blocked(WorkId::new()),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn terminal_states_allow_no_transitions() {
    use Status::*;
    for terminal in [Answered, Stopped, Blocked] {
        assert!(terminal.is_terminal());
        for to in [Queued, Answering, Answered, Stopped, Blocked] {
            assert!(!terminal.can_transition_to(to), "{terminal} -> {to}");
        }
    }
    assert!(!Answering.can_transition_to(Queued));
}

#[test]
fn retired_list_is_bounded() {
    let mut queue = PriorityQueue::new(2);
    let ids: Vec<_> = (0..4)
        .map(|i| push(&mut queue, &format!("u{i}"), Tier::Standard, i).id)
        .collect();
    for id in &ids {
        queue.withdraw(*id);
    }

    assert_eq!(queue.retired().count(), 2);
    assert!(queue.get(ids[0]).is_none());
    assert!(queue.get(ids[3]).is_some());
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

#[test]
fn restore_keeps_ids_and_order_and_skips_non_queued() {
    let mut before = PriorityQueue::default();
    let a = push(&mut before, "a", Tier::Standard, 0);
    let b = push(&mut before, "b", Tier::Priority, 1);
    let pending: Vec<WorkItem> = before.queued().cloned().collect();

    let mut stopped = pending[0].clone();
    stopped.id = WorkId::new();
    stopped.status = Status::Stopped;

    let mut restored = PriorityQueue::default();
    let count = restored.restore(pending.into_iter().chain([stopped]));

    assert_eq!(count, 2);
    assert_eq!(order(&restored), vec!["b", "a"]);
    assert!(restored.get(a.id).is_some());
    assert!(restored.get(b.id).is_some());

    // New arrivals sort after restored ones of the same tier.
    let c = restored.insert("c", "asks: c", 0, Tier::Standard, "test", at(0) - Duration::hours(1));
    assert_eq!(restored.snapshot().last().unwrap().id, c.id);
}
