//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` create DTOs for inserts
//! - Patch structs (all `Option` fields) for updates

pub mod asset;
pub mod message;
pub mod query;

pub use asset::{Asset, AssetPatch, CreateAsset};
pub use message::{CreateMessage, Message};
pub use query::{CreateQuery, Query, QueryMetrics, QuerySnapshot};
