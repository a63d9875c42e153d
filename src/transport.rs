//! Completion transport: the narrow seam to the provider's HTTP API.
//!
//! The engine only ever talks to [`CompletionTransport`], a single-method
//! async trait. The bundled [`HttpTransport`] posts the serialised payload to
//! an OpenAI-compatible `/chat/completions` endpoint via `reqwest`; tests and
//! callers with custom middleware inject their own implementation through
//! [`crate::QueryEngine::with_transport`].
//!
//! The transport returns the raw response body as `serde_json::Value` rather
//! than a parsed type: the engine keeps the raw value opaque in the result
//! and performs its own total normalisation, so a transport cannot hide a
//! malformed response behind a lossy parse.
//!
//! No retry or backoff lives here — a failed call is returned as-is, and
//! retry policy belongs to whichever HTTP client or proxy the caller puts in
//! front of the endpoint.

use crate::config::EngineConfig;
use crate::error::QueryError;
use crate::payload::RequestPayload;
use async_trait::async_trait;
use tracing::debug;

/// An OpenAI-compatible completions endpoint.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Submit a request payload and return the raw response body.
    async fn complete(&self, payload: &RequestPayload) -> Result<serde_json::Value, QueryError>;
}

/// Default reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTransport {
    /// Build a transport from the engine configuration.
    ///
    /// The API key falls back to the `OPENAI_API_KEY` environment variable;
    /// when neither is set the request is sent without authentication
    /// (local OpenAI-compatible servers accept this).
    pub fn new(config: &EngineConfig) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| QueryError::RequestFailed {
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        let endpoint = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty());

        Ok(HttpTransport {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn complete(&self, payload: &RequestPayload) -> Result<serde_json::Value, QueryError> {
        debug!("POST {} (model: {})", self.endpoint, payload.model);

        let mut request = self.client.post(&self.endpoint).json(payload);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                QueryError::RequestFailed {
                    detail: format!("request timed out: {e}"),
                }
            } else {
                QueryError::RequestFailed {
                    detail: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QueryError::RequestFailed {
                detail: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(QueryError::ApiStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| QueryError::MalformedResponse {
            detail: format!("response body is not valid JSON: {e}"),
        })
    }
}

/// Keep error bodies readable in logs and error messages.
fn truncate_body(body: &str) -> String {
    const MAX: usize = 2048;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}… [{} bytes total]", &body[..end], body.len())
    }
}
