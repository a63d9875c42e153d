//! Query orchestration: load → build → call → normalise.
//!
//! [`QueryEngine`] is a thin facade over the loader, the context builder,
//! and the transport. Each call performs those stages strictly in sequence;
//! the only concurrency is in [`QueryEngine::query_multiple`], where
//! independent PDF loads run in parallel as a pure optimisation and are
//! joined before a single payload is built. Content-part order always
//! follows the caller-supplied path order, never load-completion order.
//!
//! Nothing is shared across calls except the read-only configuration and
//! the transport handle — each call's documents and builder are call-local,
//! so concurrent queries on one engine need no locking.

use crate::config::EngineConfig;
use crate::context::ContextBuilder;
use crate::document::Document;
use crate::error::QueryError;
use crate::payload::{ChatResponse, RequestPayload, TokenUsage};
use crate::transport::{CompletionTransport, HttpTransport};
use futures::future::try_join_all;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Why the provider stopped generating.
///
/// Unrecognised provider strings map to `Other`, never to `Length` — only a
/// definite length stop may report truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural completion.
    Stop,
    /// Token limit hit — the answer is truncated.
    Length,
    /// Anything else (content filter, tool call, absent, unknown).
    Other,
}

impl FinishReason {
    /// Map a provider stop-reason string to the enum.
    pub fn from_provider(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            _ => FinishReason::Other,
        }
    }
}

/// Normalised result of one query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// First completion choice's text.
    pub answer: String,
    /// Model that produced the answer (as reported by the provider).
    pub model: String,
    /// Token counters; counters the provider omitted are 0.
    pub usage: TokenUsage,
    /// Normalised stop reason.
    pub finish_reason: FinishReason,
    /// The provider's response body, untouched.
    pub raw_response: serde_json::Value,
}

impl QueryResult {
    /// True iff the answer was cut off by the token limit.
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == FinishReason::Length
    }

    /// Normalise a raw provider response.
    ///
    /// Total over partial responses: missing usage counters become 0, an
    /// absent message content becomes an empty answer, and an unknown stop
    /// reason becomes [`FinishReason::Other`]. Only a response with no
    /// choices at all (or a non-object body) is rejected as malformed.
    ///
    /// `requested_model` fills in when the provider omits the model field.
    pub fn from_raw(
        raw: serde_json::Value,
        requested_model: &str,
    ) -> Result<QueryResult, QueryError> {
        let parsed: ChatResponse =
            serde_json::from_value(raw.clone()).map_err(|e| QueryError::MalformedResponse {
                detail: format!("unexpected response shape: {e}"),
            })?;

        let choice = parsed
            .choices
            .first()
            .ok_or_else(|| QueryError::MalformedResponse {
                detail: "response contains no completion choices".into(),
            })?;

        let answer = choice.message.content.clone().unwrap_or_default();
        let finish_reason = FinishReason::from_provider(choice.finish_reason.as_deref());
        let model = if parsed.model.is_empty() {
            requested_model.to_string()
        } else {
            parsed.model.clone()
        };

        Ok(QueryResult {
            answer,
            model,
            usage: parsed.usage,
            finish_reason,
            raw_response: raw,
        })
    }
}

/// Query PDF documents with an OpenAI-compatible vision model.
///
/// # Example
/// ```rust,no_run
/// use pdfquery::{EngineConfig, QueryEngine};
///
/// # async fn example() -> Result<(), pdfquery::QueryError> {
/// let engine = QueryEngine::new(EngineConfig::builder().model("gpt-4o").build()?)?;
/// let result = engine.query("document.pdf", "What is the main topic?").await?;
/// println!("{}", result.answer);
/// println!("tokens: {}", result.usage.total_tokens);
/// # Ok(())
/// # }
/// ```
pub struct QueryEngine {
    config: EngineConfig,
    transport: Arc<dyn CompletionTransport>,
}

impl QueryEngine {
    /// Create an engine with the default HTTP transport.
    pub fn new(config: EngineConfig) -> Result<Self, QueryError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(QueryEngine { config, transport })
    }

    /// Create an engine with a caller-supplied transport.
    ///
    /// Useful in tests and when the caller wraps the endpoint with its own
    /// middleware (caching, rate limiting, retries).
    pub fn with_transport(config: EngineConfig, transport: Arc<dyn CompletionTransport>) -> Self {
        QueryEngine { config, transport }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Query a single PDF document.
    pub async fn query(
        &self,
        pdf_path: impl AsRef<Path>,
        question: &str,
    ) -> Result<QueryResult, QueryError> {
        let document = Document::load(pdf_path, &self.config.loader).await?;
        let mut builder = self.context_builder();
        builder.add_document(document);
        self.dispatch(&builder, question).await
    }

    /// Query a pre-loaded document.
    pub async fn query_document(
        &self,
        document: Document,
        question: &str,
    ) -> Result<QueryResult, QueryError> {
        let mut builder = self.context_builder();
        builder.add_document(document);
        self.dispatch(&builder, question).await
    }

    /// Query several PDF documents together.
    ///
    /// Loads run concurrently, but the final content-part sequence follows
    /// `pdf_paths` order exactly. Any load failure aborts the whole call —
    /// no partial results.
    pub async fn query_multiple<P: AsRef<Path>>(
        &self,
        pdf_paths: &[P],
        question: &str,
    ) -> Result<QueryResult, QueryError> {
        // try_join_all preserves input order regardless of completion order.
        let documents = try_join_all(
            pdf_paths
                .iter()
                .map(|p| Document::load(p.as_ref(), &self.config.loader)),
        )
        .await?;

        let mut builder = self.context_builder();
        for document in documents {
            builder.add_document(document);
        }
        self.dispatch(&builder, question).await
    }

    /// A context builder configured like this engine.
    fn context_builder(&self) -> ContextBuilder {
        ContextBuilder::new(self.config.context.clone())
    }

    /// Build the payload, submit it, and normalise the response.
    async fn dispatch(
        &self,
        builder: &ContextBuilder,
        question: &str,
    ) -> Result<QueryResult, QueryError> {
        let payload = builder.build_request_payload(
            question,
            &self.config.model,
            self.config.max_tokens,
            self.config.temperature,
        )?;

        if self.config.verbose {
            info!(
                "request payload:\n{}",
                serde_json::to_string_pretty(&redact_payload(&payload))
                    .unwrap_or_else(|e| format!("<unserialisable payload: {e}>"))
            );
        }

        debug!(
            "dispatching query: model={}, {} documents, max_tokens={}",
            self.config.model,
            builder.documents().len(),
            self.config.max_tokens
        );

        let raw = self.transport.complete(&payload).await?;
        QueryResult::from_raw(raw, &self.config.model)
    }
}

/// Serialise a payload for debug echo with base64 image data truncated.
///
/// A single page image is hundreds of kilobytes of base64; echoing it
/// verbatim makes the verbose output useless.
fn redact_payload(payload: &RequestPayload) -> serde_json::Value {
    let mut value = serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);

    if let Some(messages) = value.get_mut("messages").and_then(|m| m.as_array_mut()) {
        for message in messages {
            let Some(parts) = message.get_mut("content").and_then(|c| c.as_array_mut()) else {
                continue;
            };
            for part in parts {
                let Some(url) = part
                    .get_mut("image_url")
                    .and_then(|i| i.get_mut("url"))
                else {
                    continue;
                };
                if let Some(s) = url.as_str() {
                    if s.starts_with("data:") && s.len() > 50 {
                        *url = serde_json::Value::String(format!(
                            "{}…[base64 truncated]",
                            &s[..50]
                        ));
                    }
                }
            }
        }
    }

    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageDetail;
    use crate::payload::{ContentPart, Message};
    use serde_json::json;

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(FinishReason::from_provider(Some("stop")), FinishReason::Stop);
        assert_eq!(
            FinishReason::from_provider(Some("length")),
            FinishReason::Length
        );
        assert_eq!(
            FinishReason::from_provider(Some("content_filter")),
            FinishReason::Other
        );
        assert_eq!(FinishReason::from_provider(None), FinishReason::Other);
    }

    #[test]
    fn normalises_complete_response() {
        let raw = json!({
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "message": {"content": "Revenue grew 20% [p.1]"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 900, "completion_tokens": 12, "total_tokens": 912}
        });

        let result = QueryResult::from_raw(raw, "gpt-4o").unwrap();
        assert_eq!(result.answer, "Revenue grew 20% [p.1]");
        assert_eq!(result.model, "gpt-4o-2024-08-06");
        assert_eq!(result.usage.prompt_tokens, 900);
        assert_eq!(result.usage.total_tokens, 912);
        assert_eq!(result.finish_reason, FinishReason::Stop);
        assert!(!result.is_truncated());
    }

    #[test]
    fn truncation_derived_only_from_length() {
        let raw = json!({
            "choices": [{"message": {"content": "partial"}, "finish_reason": "length"}]
        });
        let result = QueryResult::from_raw(raw, "gpt-4o").unwrap();
        assert_eq!(result.finish_reason, FinishReason::Length);
        assert!(result.is_truncated());

        let raw = json!({
            "choices": [{"message": {"content": "x"}, "finish_reason": "max_output_reached"}]
        });
        let result = QueryResult::from_raw(raw, "gpt-4o").unwrap();
        // Unknown strings must map to Other, never Length.
        assert_eq!(result.finish_reason, FinishReason::Other);
        assert!(!result.is_truncated());
    }

    #[test]
    fn minimal_response_normalises_with_defaults() {
        let raw = json!({"choices": [{"message": {}}]});
        let result = QueryResult::from_raw(raw, "gpt-4o").unwrap();
        assert_eq!(result.answer, "");
        assert_eq!(result.usage, TokenUsage::default());
        assert_eq!(result.finish_reason, FinishReason::Other);
        assert_eq!(result.model, "gpt-4o");
    }

    #[test]
    fn empty_object_is_malformed() {
        let err = QueryResult::from_raw(json!({}), "gpt-4o").unwrap_err();
        assert!(matches!(err, QueryError::MalformedResponse { .. }));
    }

    #[test]
    fn non_object_body_is_malformed() {
        let err = QueryResult::from_raw(json!("oops"), "gpt-4o").unwrap_err();
        assert!(matches!(err, QueryError::MalformedResponse { .. }));
    }

    #[test]
    fn raw_response_is_preserved_verbatim() {
        let raw = json!({
            "id": "chatcmpl-123",
            "choices": [{"message": {"content": "hi"}, "finish_reason": "stop"}],
            "provider_extra": {"anything": true}
        });
        let result = QueryResult::from_raw(raw.clone(), "gpt-4o").unwrap();
        assert_eq!(result.raw_response, raw);
    }

    #[test]
    fn redact_payload_truncates_data_uris_only() {
        let big_uri = format!("data:image/png;base64,{}", "A".repeat(4096));
        let payload = RequestPayload {
            model: "gpt-4o".into(),
            messages: vec![
                Message::system("keep me intact"),
                Message::user(vec![
                    ContentPart::text("Page 1 of a.pdf:"),
                    ContentPart::image(big_uri, ImageDetail::High),
                ]),
            ],
            max_tokens: 64,
            temperature: 0.0,
        };

        let redacted = redact_payload(&payload);
        let parts = redacted["messages"][1]["content"].as_array().unwrap();
        let url = parts[1]["image_url"]["url"].as_str().unwrap();
        assert!(url.ends_with("…[base64 truncated]"));
        assert!(url.len() < 100);
        // Text parts and the system message are untouched.
        assert_eq!(parts[0]["text"], "Page 1 of a.pdf:");
        assert_eq!(redacted["messages"][0]["content"], "keep me intact");
    }
}
