//! Content-model construction: documents + question → ordered content parts.
//!
//! The builder is deterministic and pure at the formatting seam: documents
//! accumulate in an append-only [`DocumentSet`], and both output operations
//! ([`ContextBuilder::build_request_payload`] and
//! [`ContextBuilder::build_message_history`]) are read-only functions over
//! that set — calling one never affects the other, and re-running either on
//! the same inputs yields an identical part sequence.
//!
//! ## Part order per page
//!
//! Every page contributes, in order:
//! 1. a text label naming the document and page — always emitted, because it
//!    anchors the citations the system prompt demands;
//! 2. the extracted page text, iff the text layer is enabled and the page
//!    has meaningful text;
//! 3. the rendered page image at the configured detail level — always.
//!
//! Text is additive, never a substitute for the image: vision models read
//! layout, tables, and figures off the raster even when a text layer exists.

use crate::config::ContextConfig;
use crate::document::Document;
use crate::error::QueryError;
use crate::payload::{ContentPart, Message, RequestPayload};
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use tracing::warn;

/// An append-only, insertion-ordered collection of documents.
///
/// Adding the same logical document twice duplicates its pages in the output
/// — the set performs no deduplication, by design. What it does do is keep
/// citation labels unambiguous: a repeated source name gets a ` (N)` suffix.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    entries: Vec<DocumentEntry>,
}

#[derive(Debug, Clone)]
struct DocumentEntry {
    document: Document,
    display_name: String,
}

impl DocumentSet {
    /// Append a document, assigning its citation display name.
    pub fn push(&mut self, document: Document) {
        if document.page_count() == 0 {
            warn!(
                "document '{}' has zero pages; it will contribute nothing to the context",
                document.source_id()
            );
        }

        let base = document.source_id().to_string();
        let seen = self
            .entries
            .iter()
            .filter(|e| e.document.source_id() == base)
            .count();
        let display_name = if seen == 0 {
            base
        } else {
            format!("{} ({})", base, seen + 1)
        };

        self.entries.push(DocumentEntry {
            document,
            display_name,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> impl Iterator<Item = &DocumentEntry> {
        self.entries.iter()
    }
}

/// Builds multimodal requests from PDF documents.
///
/// # Example
/// ```rust,no_run
/// use pdfquery::{ContextBuilder, ContextConfig, Document, LoaderConfig};
///
/// # async fn example() -> Result<(), pdfquery::QueryError> {
/// let doc = Document::load("report.pdf", &LoaderConfig::default()).await?;
///
/// let mut builder = ContextBuilder::new(ContextConfig::default());
/// builder.add_document(doc);
///
/// let payload = builder.build_request_payload("Summarize the key points.", "gpt-4o", 2048, 0.0)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    config: ContextConfig,
    documents: DocumentSet,
}

impl ContextBuilder {
    /// Create a builder with the given content-model configuration.
    pub fn new(config: ContextConfig) -> Self {
        ContextBuilder {
            config,
            documents: DocumentSet::default(),
        }
    }

    /// Append a document to the context. Insertion order is preserved in
    /// every output; adding the same logical document twice duplicates its
    /// pages (see [`DocumentSet`]).
    pub fn add_document(&mut self, document: Document) -> &mut Self {
        self.documents.push(document);
        self
    }

    /// The documents added so far.
    pub fn documents(&self) -> &DocumentSet {
        &self.documents
    }

    /// The effective system prompt (configured override or built-in default).
    fn system_prompt(&self) -> &str {
        self.config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// System message content: the prompt plus a metadata section so the
    /// model can resolve citations across multiple documents.
    fn system_message_content(&self) -> String {
        let mut out = String::from(self.system_prompt());
        out.push_str("\n\n## Document Metadata\n");
        for entry in self.documents.iter() {
            out.push_str(&format!(
                "\n### Document: {}\n- Total pages: {}\n- Source file: {}\n",
                entry.display_name,
                entry.document.page_count(),
                entry.document.source_id()
            ));
        }
        out
    }

    /// Build the ordered content-part sequence for the user message.
    ///
    /// Deterministic: output is a pure function of the document set, the
    /// configuration, and `question`. An empty question is permitted
    /// (callers seeding history before the first real turn).
    pub fn build_content_parts(&self, question: &str) -> Vec<ContentPart> {
        let mut parts = Vec::new();

        for entry in self.documents.iter() {
            let mime = entry.document.mime_type();
            for page in entry.document.pages() {
                parts.push(ContentPart::text(format!(
                    "Page {} of {}:",
                    page.page_number, entry.display_name
                )));

                if self.config.include_text_layer && page.has_text {
                    parts.push(ContentPart::text(page.text.clone()));
                }

                parts.push(ContentPart::image(
                    page.to_data_uri(mime),
                    self.config.image_detail,
                ));
            }
        }

        parts.push(ContentPart::text(format!("\n\nQuestion: {question}")));
        parts
    }

    /// Build the complete chat-completions request payload.
    ///
    /// # Errors
    /// [`QueryError::EmptyContext`] when no documents were added — an empty
    /// but syntactically valid payload is never produced.
    pub fn build_request_payload(
        &self,
        question: &str,
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<RequestPayload, QueryError> {
        Ok(RequestPayload {
            model: model.to_string(),
            messages: self.build_message_history(question)?,
            max_tokens,
            temperature,
        })
    }

    /// Build the system + user message pair for reuse as seed history by an
    /// external conversational framework.
    ///
    /// The contract is only the role/content structure: the framework owns
    /// all subsequent turn management and appends to this list itself.
    ///
    /// # Errors
    /// [`QueryError::EmptyContext`] when no documents were added.
    pub fn build_message_history(&self, question: &str) -> Result<Vec<Message>, QueryError> {
        if self.documents.is_empty() {
            return Err(QueryError::EmptyContext);
        }

        Ok(vec![
            Message::system(self.system_message_content()),
            Message::user(self.build_content_parts(question)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImageDetail, LoaderConfig};
    use crate::document::Page;
    use crate::payload::MessageContent;

    fn text_page(n: u32, text: &str) -> Page {
        Page {
            page_number: n,
            text: text.to_string(),
            has_text: true,
            image: vec![n as u8; 8],
            width: 100,
            height: 140,
        }
    }

    fn image_only_page(n: u32) -> Page {
        Page {
            page_number: n,
            text: String::new(),
            has_text: false,
            image: vec![n as u8; 8],
            width: 100,
            height: 140,
        }
    }

    fn doc(name: &str, pages: Vec<Page>) -> Document {
        Document::from_pages(name, pages, LoaderConfig::default())
    }

    #[test]
    fn text_page_emits_label_text_image_in_order() {
        let mut builder = ContextBuilder::new(ContextConfig::default());
        builder.add_document(doc("a.pdf", vec![text_page(1, "Revenue grew 20%")]));

        let parts = builder.build_content_parts("What grew?");
        // label, text, image, question
        assert_eq!(parts.len(), 4);
        assert!(matches!(&parts[0], ContentPart::Text { text } if text == "Page 1 of a.pdf:"));
        assert!(matches!(&parts[1], ContentPart::Text { text } if text == "Revenue grew 20%"));
        assert!(parts[2].is_image());
        assert!(matches!(&parts[3], ContentPart::Text { text } if text.contains("What grew?")));
    }

    #[test]
    fn image_only_page_never_emits_text_part() {
        let mut builder = ContextBuilder::new(ContextConfig::default());
        builder.add_document(doc("scan.pdf", vec![image_only_page(1)]));

        let parts = builder.build_content_parts("q");
        // label, image, question — no text part regardless of include_text_layer
        assert_eq!(parts.len(), 3);
        assert!(parts[0].is_text());
        assert!(parts[1].is_image());
    }

    #[test]
    fn text_layer_disabled_drops_text_but_keeps_label() {
        let config = ContextConfig {
            include_text_layer: false,
            ..ContextConfig::default()
        };
        let mut builder = ContextBuilder::new(config);
        builder.add_document(doc("a.pdf", vec![text_page(1, "body text")]));

        let parts = builder.build_content_parts("q");
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], ContentPart::Text { text } if text.starts_with("Page 1")));
        assert!(parts[1].is_image());
    }

    #[test]
    fn mixed_two_page_scenario() {
        // Page 1 has text, page 2 is a scan: label, text, image, label, image,
        // then the question — 6 parts total.
        let mut builder = ContextBuilder::new(ContextConfig::default());
        builder.add_document(doc(
            "q1.pdf",
            vec![text_page(1, "Revenue grew 20%"), image_only_page(2)],
        ));

        let parts = builder.build_content_parts("What grew?");
        assert_eq!(parts.len(), 6);
        assert!(matches!(&parts[0], ContentPart::Text { text } if text == "Page 1 of q1.pdf:"));
        assert!(matches!(&parts[1], ContentPart::Text { text } if text == "Revenue grew 20%"));
        assert!(parts[2].is_image());
        assert!(matches!(&parts[3], ContentPart::Text { text } if text == "Page 2 of q1.pdf:"));
        assert!(parts[4].is_image());
        assert!(matches!(&parts[5], ContentPart::Text { text } if text.contains("What grew?")));
    }

    #[test]
    fn document_order_matches_insertion_order() {
        let mut builder = ContextBuilder::new(ContextConfig::default());
        builder
            .add_document(doc("first.pdf", vec![image_only_page(1)]))
            .add_document(doc("second.pdf", vec![image_only_page(1)]));

        let parts = builder.build_content_parts("q");
        let labels: Vec<&str> = parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } if text.starts_with("Page ") => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["Page 1 of first.pdf:", "Page 1 of second.pdf:"]);
    }

    #[test]
    fn rebuilding_is_byte_identical() {
        let mut builder = ContextBuilder::new(ContextConfig::default());
        builder.add_document(doc(
            "a.pdf",
            vec![text_page(1, "alpha"), image_only_page(2)],
        ));

        let first = serde_json::to_vec(&builder.build_content_parts("q")).unwrap();
        let second = serde_json::to_vec(&builder.build_content_parts("q")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_documents_duplicate_pages_and_disambiguate_names() {
        let d = doc("report.pdf", vec![text_page(1, "same content here")]);
        let mut builder = ContextBuilder::new(ContextConfig::default());
        builder.add_document(d.clone()).add_document(d);

        let parts = builder.build_content_parts("q");
        // Two full page runs (label+text+image each) plus the question.
        assert_eq!(parts.len(), 7);
        assert!(matches!(&parts[0], ContentPart::Text { text } if text == "Page 1 of report.pdf:"));
        assert!(
            matches!(&parts[3], ContentPart::Text { text } if text == "Page 1 of report.pdf (2):")
        );
    }

    #[test]
    fn zero_page_document_is_a_noop_not_an_error() {
        let mut builder = ContextBuilder::new(ContextConfig::default());
        builder.add_document(doc("empty.pdf", vec![]));

        let parts = builder.build_content_parts("q");
        // Only the question part.
        assert_eq!(parts.len(), 1);
        // Still a valid payload — the document set is non-empty.
        assert!(builder.build_request_payload("q", "gpt-4o", 64, 0.0).is_ok());
    }

    #[test]
    fn empty_question_is_permitted() {
        let mut builder = ContextBuilder::new(ContextConfig::default());
        builder.add_document(doc("a.pdf", vec![image_only_page(1)]));
        let history = builder.build_message_history("").unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn no_documents_is_empty_context_error() {
        let builder = ContextBuilder::new(ContextConfig::default());
        let err = builder
            .build_request_payload("q", "gpt-4o", 64, 0.0)
            .unwrap_err();
        assert!(matches!(err, QueryError::EmptyContext));
        assert!(matches!(
            builder.build_message_history("q").unwrap_err(),
            QueryError::EmptyContext
        ));
    }

    #[test]
    fn payload_shape_and_config_forwarding() {
        let config = ContextConfig {
            image_detail: ImageDetail::Low,
            ..ContextConfig::default()
        };
        let mut builder = ContextBuilder::new(config);
        builder.add_document(doc("a.pdf", vec![image_only_page(1)]));

        let payload = builder
            .build_request_payload("q", "gpt-4o-mini", 512, 0.7)
            .unwrap();
        assert_eq!(payload.model, "gpt-4o-mini");
        assert_eq!(payload.max_tokens, 512);
        assert_eq!(payload.temperature, 0.7);
        assert_eq!(payload.messages.len(), 2);

        // System message is plain text and carries the metadata header.
        match &payload.messages[0].content {
            MessageContent::Text(text) => {
                assert!(text.contains("## Document Metadata"));
                assert!(text.contains("a.pdf"));
            }
            MessageContent::Parts(_) => panic!("system content must be a plain string"),
        }

        // Image detail is forwarded verbatim.
        match &payload.messages[1].content {
            MessageContent::Parts(parts) => {
                let detail = parts.iter().find_map(|p| match p {
                    ContentPart::ImageUrl { image_url } => Some(image_url.detail),
                    _ => None,
                });
                assert_eq!(detail, Some(ImageDetail::Low));
            }
            MessageContent::Text(_) => panic!("user content must be a part array"),
        }
    }

    #[test]
    fn custom_system_prompt_replaces_default() {
        let config = ContextConfig {
            system_prompt: Some("You are analysing a technical document.".into()),
            ..ContextConfig::default()
        };
        let mut builder = ContextBuilder::new(config);
        builder.add_document(doc("a.pdf", vec![image_only_page(1)]));

        let history = builder.build_message_history("q").unwrap();
        match &history[0].content {
            MessageContent::Text(text) => {
                assert!(text.starts_with("You are analysing a technical document."));
                assert!(!text.contains("CRITICAL"));
            }
            _ => panic!("system content must be a plain string"),
        }
    }
}
