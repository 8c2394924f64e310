//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod asset_repo;
pub mod message_repo;
pub mod query_repo;

pub use asset_repo::AssetRepo;
pub use message_repo::MessageRepo;
pub use query_repo::QueryRepo;
