//! Pipeline stage errors.

use dreamcut_model::ModelApiError;

/// Errors that abort a pipeline run.
///
/// Per-asset analysis failures are NOT stage errors; they are absorbed
/// into the asset row and the run continues. A `StageError` moves the
/// whole query to `failed`.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The query or its inputs are unusable.
    #[error("{0}")]
    Validation(String),

    /// An upstream model call timed out (retried before surfacing).
    #[error("{stage} stage timed out waiting on the model endpoint")]
    UpstreamTimeout {
        /// Stage label for the failure message, e.g. `"query analysis"`.
        stage: &'static str,
    },

    /// An upstream model call failed for a non-timeout reason.
    #[error("{0}")]
    Upstream(String),

    /// A database write failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    /// The run was cancelled by the client.
    #[error("query cancelled by client")]
    Cancelled,

    /// Too few assets analyzed successfully to continue.
    #[error("only {succeeded} of {total} assets analyzed successfully (minimum {required})")]
    BelowAssetThreshold {
        succeeded: usize,
        total: usize,
        required: usize,
    },
}

impl StageError {
    /// Map a model-API failure, tagging timeouts with the stage label.
    ///
    /// Unparsable model output is a validation failure (the response is
    /// unusable no matter how often we ask); transport and HTTP-level
    /// failures stay upstream errors.
    pub fn from_model(err: ModelApiError, stage: &'static str) -> Self {
        match err {
            ModelApiError::Timeout { .. } => Self::UpstreamTimeout { stage },
            ModelApiError::Malformed(msg) => {
                Self::Validation(format!("{stage} returned an unusable response: {msg}"))
            }
            other => Self::Upstream(other.to_string()),
        }
    }

    /// True when a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_map_to_retryable_stage_timeout() {
        let err = StageError::from_model(
            ModelApiError::Timeout { timeout_secs: 5 },
            "query analysis",
        );
        assert!(matches!(
            err,
            StageError::UpstreamTimeout {
                stage: "query analysis"
            }
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn malformed_responses_are_validation_failures() {
        let err = StageError::from_model(
            ModelApiError::Malformed("missing field `subjects`".to_string()),
            "query analysis",
        );
        assert!(matches!(err, StageError::Validation(_)));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("missing field `subjects`"));
    }

    #[test]
    fn api_failures_stay_upstream_errors() {
        let err = StageError::from_model(
            ModelApiError::Api {
                status: 500,
                body: "server error".to_string(),
            },
            "asset analysis",
        );
        assert!(matches!(err, StageError::Upstream(_)));
        assert!(!err.is_retryable());
    }
}
