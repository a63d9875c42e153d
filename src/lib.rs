//! # pdfquery
//!
//! Query PDF documents with vision-capable LLMs.
//!
//! ## Why this crate?
//!
//! Text extraction alone loses what makes many PDFs hard: scanned pages,
//! tables, figures, and multi-column layouts. Instead of choosing between
//! text and pixels, this crate sends both — for every page it emits a
//! citation label, the extracted text layer (when the page has one), and a
//! rendered page image, so a vision model can read the layout as a human
//! would and still quote the text layer verbatim. Answers come back with
//! page citations because the default system prompt demands them.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF(s)
//!  │
//!  ├─ 1. Load       extract text + rasterise pages via pdfium (spawn_blocking)
//!  ├─ 2. Build      per page: label + text layer + base64 image content parts
//!  ├─ 3. Compose    system citation prompt + user parts + question → payload
//!  ├─ 4. Call       POST to an OpenAI-compatible /chat/completions endpoint
//!  └─ 5. Normalise  answer, token usage, finish reason → QueryResult
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfquery::{EngineConfig, QueryEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from OPENAI_API_KEY when not set explicitly
//!     let engine = QueryEngine::new(EngineConfig::default())?;
//!     let result = engine.query("document.pdf", "What is the main topic?").await?;
//!     println!("{}", result.answer);
//!     eprintln!("tokens: {} in / {} out",
//!         result.usage.prompt_tokens,
//!         result.usage.completion_tokens);
//!     if result.is_truncated() {
//!         eprintln!("warning: answer was cut off — raise max_tokens");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Manual context construction
//!
//! The builder is usable on its own when you want the payload without the
//! call — for inspection, for a custom transport, or to seed a
//! conversational agent with document context:
//!
//! ```rust,no_run
//! use pdfquery::{ContextBuilder, ContextConfig, Document, LoaderConfig};
//!
//! # async fn example() -> Result<(), pdfquery::QueryError> {
//! let doc = Document::load("paper.pdf", &LoaderConfig::default()).await?;
//! let mut builder = ContextBuilder::new(ContextConfig::default());
//! builder.add_document(doc);
//!
//! // Seed history for an external conversational framework:
//! let history = builder.build_message_history("What is this document about?")?;
//!
//! // Or the full request payload for a custom API call:
//! let payload = builder.build_request_payload("Summarize it.", "gpt-4o", 4096, 0.0)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Multiple documents
//!
//! [`QueryEngine::query_multiple`] loads each path into its own document
//! (concurrently) and composes one request whose citations distinguish the
//! sources. Part order always follows the path order you pass in.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod payload;
pub mod prompts;
pub mod transport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ContextConfig, EngineConfig, EngineConfigBuilder, ImageDetail, ImageFormat, LoaderConfig};
pub use context::{ContextBuilder, DocumentSet};
pub use document::{Document, Page};
pub use engine::{FinishReason, QueryEngine, QueryResult};
pub use error::{QueryError, QueryStage};
pub use payload::{ContentPart, ImageUrl, Message, MessageContent, RequestPayload, Role, TokenUsage};
pub use transport::{CompletionTransport, HttpTransport};
