//! Answer pump: the single consumer that drains the queue.
//!
//! At most one generation is in flight at any time. Each cycle claims the
//! next eligible item, runs the generator under a timeout, then delivers the
//! answer or marks the item blocked. The loop wakes on new admissions, on a
//! fallback poll tick, and pauses for a short cooldown between cycles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use tokio::sync::Notify;
use tracing::{Instrument, error, info};

use super::Engine;
use crate::error::Result;
use crate::generate::{GenerationError, GenerationRequest, Generator};
use crate::model::WorkId;
use crate::telemetry::metrics;
use crate::telemetry::work::{record_state_transition, start_answer_span};

/// Configuration for the answer pump.
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Pause between cycles, so a failing generator is not hammered.
    pub cooldown: Duration,
    /// Poll interval fallback when no wake signal arrives.
    pub poll_interval: Duration,
    /// Caller-side bound on a single generation.
    pub generation_timeout: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(300),
            poll_interval: Duration::from_secs(5),
            generation_timeout: Duration::from_secs(30),
        }
    }
}

/// What a single pump cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle holds the in-flight slot.
    Busy,
    /// Nothing queued.
    Idle,
    Answered(WorkId),
    Blocked(WorkId),
}

/// The pump loop: wait for work, answer one item at a time.
pub struct AnswerPump {
    engine: Engine,
    generator: Arc<dyn Generator>,
    config: PumpConfig,
    shutdown: Arc<Notify>,
    in_flight: Arc<AtomicBool>,
}

impl Clone for AnswerPump {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            generator: Arc::clone(&self.generator),
            config: self.config.clone(),
            shutdown: Arc::clone(&self.shutdown),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl AnswerPump {
    pub fn new(engine: Engine, generator: Arc<dyn Generator>, config: PumpConfig) -> Self {
        Self {
            engine,
            generator,
            config,
            shutdown: Arc::new(Notify::new()),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal the pump to shut down.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Is a generation currently running?
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run the pump loop until shutdown.
    pub async fn run(&self) -> Result<()> {
        info!("answer pump started");

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("answer pump shutting down");
                    return Ok(());
                }
                _ = self.engine.work_ready() => {}
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            // Drain until idle, cooling down between cycles.
            loop {
                match self.run_once().await {
                    Ok(CycleOutcome::Idle | CycleOutcome::Busy) => break,
                    Ok(CycleOutcome::Answered(_) | CycleOutcome::Blocked(_)) => {}
                    Err(e) => error!("pump cycle error: {e}"),
                }

                tokio::select! {
                    _ = self.shutdown.notified() => {
                        info!("answer pump shutting down");
                        return Ok(());
                    }
                    _ = tokio::time::sleep(self.config.cooldown) => {}
                }
            }
        }
    }

    /// Run one cycle: claim, generate, deliver or block.
    pub async fn run_once(&self) -> Result<CycleOutcome> {
        let Some(_slot) = InFlight::acquire(&self.in_flight) else {
            return Ok(CycleOutcome::Busy);
        };

        let Some(item) = self.engine.claim_next()? else {
            return Ok(CycleOutcome::Idle);
        };

        let span = start_answer_span(&item.tier.to_string(), &item.id.0);

        async {
            record_state_transition(&span, "queued", "answering");

            let request = GenerationRequest::from(&item);
            let started = Instant::now();
            let result = tokio::time::timeout(
                self.config.generation_timeout,
                self.generator.generate(&request),
            )
            .await
            .unwrap_or(Err(GenerationError::Timeout(self.config.generation_timeout)));
            let duration_ms = started.elapsed().as_millis() as u64;

            metrics::generation_duration_ms().record(
                duration_ms as f64,
                &[KeyValue::new("tier", item.tier.to_string())],
            );

            match result {
                Ok(answer) => {
                    record_state_transition(&span, "answering", "answered");
                    info!(id = %item.id, duration_ms, "answer ready");
                    record_answer(&item.tier.to_string(), "answered");
                    self.engine.complete(&item, answer)?;
                    Ok(CycleOutcome::Answered(item.id))
                }
                Err(e) => {
                    record_state_transition(&span, "answering", "blocked");
                    error!(id = %item.id, error = %e, duration_ms, "generation failed");
                    record_answer(&item.tier.to_string(), "blocked");
                    self.engine.fail(&item, &e)?;
                    Ok(CycleOutcome::Blocked(item.id))
                }
            }
        }
        .instrument(span.clone())
        .await
    }
}

/// Holds the single in-flight slot until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn record_answer(tier: &str, result: &'static str) {
    metrics::answers().add(
        1,
        &[
            KeyValue::new("tier", tier.to_string()),
            KeyValue::new("result", result),
        ],
    );
}
