//! Metric instrument factories for askq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"askq"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for askq instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("askq")
}

/// Counter: asks submitted.
/// Labels: `origin`, `result` ("created" | "duplicate" | "blocked" | "invalid").
pub fn asks_submitted() -> Counter<u64> {
    meter()
        .u64_counter("askq.asks.submitted")
        .with_description("Number of asks submitted")
        .build()
}

/// Counter: work item status transitions.
/// Labels: `from`, `to`.
pub fn state_transitions() -> Counter<u64> {
    meter()
        .u64_counter("askq.work.state_transitions")
        .with_description("Number of work item status transitions")
        .build()
}

/// Counter: finished answer cycles.
/// Labels: `tier`, `result` ("answered" | "blocked").
pub fn answers() -> Counter<u64> {
    meter()
        .u64_counter("askq.answers")
        .with_description("Number of finished answer cycles")
        .build()
}

/// Histogram: generation duration in milliseconds.
/// Labels: `tier`.
pub fn generation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("askq.generation.duration_ms")
        .with_description("Answer generation duration in milliseconds")
        .with_unit("ms")
        .build()
}
