//! DreamCut pipeline event infrastructure.
//!
//! This crate provides the building blocks for realtime progress
//! tracking:
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PipelineEvent`] — the canonical row-change event, scoped by query
//!   and carrying the full mutated row.
//! - [`ProgressStore`] — the persistence facade that couples every row
//!   mutation to exactly one event publish.

pub mod bus;
pub mod progress;

pub use bus::{EventBus, PipelineEvent};
pub use progress::ProgressStore;
