//! Shared primitive type aliases.

/// All entity primary keys are UUIDv7 (time-ordered, generated app-side).
pub type EntityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
