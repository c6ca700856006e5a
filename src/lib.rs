// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod alert;
pub mod config;
pub mod dedup;
pub mod ingest;
pub mod mention;
pub mod pipeline;
pub mod sentiment;
pub mod store;
pub mod telemetry;
pub mod threshold;

// ---- Re-exports for stable public API ----
pub use crate::config::PipelineConfig;
pub use crate::mention::{Mention, Provenance, SentimentLabel, Source};
pub use crate::pipeline::{Pipeline, PipelineReport};
