//! Entity lifecycle enums.
//!
//! Each enum maps to a Postgres enum type created in the initial
//! migration; the `sqlx(type_name = ...)` attributes must stay in sync
//! with the `CREATE TYPE` statements there.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle status of a query.
///
/// Transitions only `Processing -> Completed` or `Processing -> Failed`,
/// never reversed; a query reaches a terminal status exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS)]
#[sqlx(type_name = "query_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum QueryStatus {
    Processing,
    Completed,
    Failed,
}

impl QueryStatus {
    /// True for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Pipeline stage of a query while it is processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS)]
#[sqlx(type_name = "query_stage", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum QueryStage {
    Init,
    Analyzing,
    Merging,
    Done,
}

/// Lifecycle status of a single asset.
///
/// Exactly one analysis attempt moves an asset through
/// `Pending -> Analyzing -> Completed | Failed`; terminal rows are
/// immutable (enforced by SQL guards in the repository layer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS)]
#[sqlx(type_name = "asset_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AssetStatus {
    Pending,
    Analyzing,
    Completed,
    Failed,
}

impl AssetStatus {
    /// True for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Media kind of a user-supplied asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS)]
#[sqlx(type_name = "media_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MediaType {
    Image,
    Video,
    Audio,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        };
        f.write_str(s)
    }
}

/// Declared or detected creative intent of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS)]
#[sqlx(type_name = "intent", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Intent {
    Image,
    Video,
    Audio,
    Mixed,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Mixed => "mixed",
        };
        f.write_str(s)
    }
}

impl Intent {
    /// Whether an asset of the given media type directly serves this intent.
    pub fn accepts(self, media: MediaType) -> bool {
        matches!(
            (self, media),
            (Self::Image, MediaType::Image)
                | (Self::Video, MediaType::Image)
                | (Self::Video, MediaType::Video)
                | (Self::Video, MediaType::Audio)
                | (Self::Audio, MediaType::Audio)
                | (Self::Mixed, _)
        )
    }
}

/// Narration message kind for the live chat-style progress feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS)]
#[sqlx(type_name = "message_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MessageType {
    Status,
    AssetStart,
    AssetProgress,
    AssetComplete,
    Merge,
    Final,
    Conflict,
    Suggestion,
    Error,
}

/// Single ordinal impact scale used for every conflict and gap.
///
/// The original design mixed three- and four-level scales; this is the
/// unified scale used everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!QueryStatus::Processing.is_terminal());
        assert!(QueryStatus::Completed.is_terminal());
        assert!(QueryStatus::Failed.is_terminal());
        assert!(!AssetStatus::Pending.is_terminal());
        assert!(!AssetStatus::Analyzing.is_terminal());
        assert!(AssetStatus::Completed.is_terminal());
    }

    #[test]
    fn intent_accepts_matching_media() {
        assert!(Intent::Image.accepts(MediaType::Image));
        assert!(!Intent::Image.accepts(MediaType::Audio));
        assert!(Intent::Video.accepts(MediaType::Audio));
        assert!(Intent::Mixed.accepts(MediaType::Video));
        assert!(!Intent::Audio.accepts(MediaType::Image));
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&QueryStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(
            serde_json::to_string(&MessageType::AssetComplete).unwrap(),
            "\"asset_complete\""
        );
    }
}
