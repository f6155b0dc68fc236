//! Answer cycle span helpers.
//!
//! Provides span creation and status-transition recording for work items
//! flowing through the pump.

use tracing::Span;
use uuid::Uuid;

/// Start a span for one answer cycle.
///
/// The `answer.status` field is declared empty and can be updated via
/// [`record_state_transition`].
pub fn start_answer_span(tier: &str, work_id: &Uuid) -> Span {
    tracing::info_span!(
        "answer.generate",
        "answer.tier" = tier,
        "answer.id" = %work_id,
        "answer.status" = tracing::field::Empty,
    )
}

/// Record a status transition on the given span.
///
/// Emits a tracing `info` event scoped to the span and counts the transition.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.record("answer.status", to);
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
    super::metrics::state_transitions().add(
        1,
        &[
            opentelemetry::KeyValue::new("from", from.to_string()),
            opentelemetry::KeyValue::new("to", to.to_string()),
        ],
    );
}
