//! DreamCut domain core.
//!
//! Zero-internal-dependency crate holding the shared domain vocabulary
//! (entity status enums, analysis shapes) and the pure pipeline logic
//! (synthesis cross-referencing, script assembly, cost model) used by
//! the database, pipeline, and API crates.

pub mod analysis;
pub mod cost;
pub mod error;
pub mod script;
pub mod status;
pub mod synthesis;
pub mod types;
