//! Pipeline orchestrator.
//!
//! Drives one query through the staged lifecycle
//! `init -> analyzing -> merging -> done`, fanning per-asset analysis
//! out over a bounded worker pool and absorbing individual asset
//! failures. All state changes flow through the progress store, so the
//! realtime feed sees the same transitions the database does.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod retry;

pub use config::{PipelineConfig, RetryConfig};
pub use error::StageError;
pub use orchestrator::Orchestrator;
