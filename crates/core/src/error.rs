//! Domain-level error type shared across crates.

use crate::types::EntityId;

/// Errors produced by domain logic, independent of any transport.
///
/// The API crate maps these onto HTTP statuses in its `AppError`
/// `IntoResponse` implementation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An entity lookup failed.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Human-readable entity kind, e.g. `"Query"`.
        entity: &'static str,
        /// The id that was looked up.
        id: EntityId,
    },

    /// Input failed domain validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation conflicts with current entity state
    /// (e.g. mutating a query that already reached a terminal status).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}
