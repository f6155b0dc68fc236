//! # askq
//!
//! Admission and scheduling core for live viewer questions.
//!
//! Asks arrive from untrusted sources (HTTP, moderators, tip and redemption
//! webhooks), pass moderation, normalization, deduplication and tiering,
//! and land in one priority queue. A single-flight answer pump drains the
//! queue through a pluggable generator, and a notification hub fans queue
//! and answer events out to every connected observer.

pub mod admission;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod generate;
pub mod hub;
pub mod intake;
pub mod llm;
pub mod model;
pub mod queue;
pub mod storage;
pub mod telemetry;
