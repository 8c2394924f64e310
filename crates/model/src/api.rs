//! REST client for the hosted inference endpoint.
//!
//! Wraps the inference HTTP API (single `POST /v1/infer` with a model
//! name, a prompt, and a JSON response format) using [`reqwest`].

use std::time::Duration;

use serde::Deserialize;

/// HTTP client for the inference endpoint.
///
/// Holds the base URL and API key for one endpoint; cheap to clone
/// (reqwest clients share their connection pool).
#[derive(Clone)]
pub struct ModelApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Response envelope returned by `/v1/infer`.
#[derive(Debug, Deserialize)]
struct InferResponse {
    /// Model output, requested as a JSON object.
    output: serde_json::Value,
}

/// Errors from the inference API layer.
#[derive(Debug, thiserror::Error)]
pub enum ModelApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(reqwest::Error),

    /// The call exceeded its configured timeout.
    #[error("Inference call timed out after {timeout_secs}s")]
    Timeout {
        /// The timeout that was exceeded, in seconds.
        timeout_secs: u64,
    },

    /// The endpoint returned a non-2xx status code.
    #[error("Inference API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response could not be parsed into the expected shape.
    #[error("Malformed model response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ModelApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // The per-request timeout is attached by `infer`; reqwest
            // does not carry the duration back, so it is reported there.
            Self::Timeout { timeout_secs: 0 }
        } else {
            Self::Request(err)
        }
    }
}

impl ModelApi {
    /// Create a client for the endpoint at `base_url`.
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Base URL of the inference endpoint.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one inference call and return the model's JSON output.
    ///
    /// The timeout applies to the whole request; exceeding it maps to
    /// [`ModelApiError::Timeout`].
    pub async fn infer(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, ModelApiError> {
        let url = format!("{}/v1/infer", self.base_url);
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "response_format": "json",
        });

        let mut request = self.client.post(&url).json(&body).timeout(timeout);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ModelApiError::Timeout {
                    timeout_secs: timeout.as_secs(),
                }
            } else {
                ModelApiError::Request(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: InferResponse = response
            .json()
            .await
            .map_err(|e| ModelApiError::Malformed(e.to_string()))?;
        Ok(envelope.output)
    }
}
