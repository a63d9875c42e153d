//! Wire types for the OpenAI-compatible chat-completions schema.
//!
//! These serde types are the contract with the provider: [`ContentPart`] is
//! the atomic unit of a multimodal message, [`Message`] pairs a role with
//! either plain text (system) or an ordered part array (user), and
//! [`RequestPayload`] is the complete request body.
//!
//! The response side ([`ChatResponse`] and friends) deserialises with
//! `#[serde(default)]` on every field, so normalisation is a total function
//! over partial or malformed provider responses — a missing usage block or
//! absent finish reason yields defined defaults instead of a decode error.

use crate::config::ImageDetail;
use serde::{Deserialize, Serialize};

// ── Request side ─────────────────────────────────────────────────────────

/// One atomic unit of a multimodal message.
///
/// Serialises to the provider schema:
/// `{"type":"text","text":…}` or
/// `{"type":"image_url","image_url":{"url":…,"detail":…}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A text fragment.
    Text { text: String },
    /// An image reference: base64 data URI plus detail hint.
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    /// Build a text part.
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Build an image part from a data URI and detail level.
    pub fn image(data_uri: impl Into<String>, detail: ImageDetail) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: data_uri.into(),
                detail,
            },
        }
    }

    /// True for `Text` parts.
    pub fn is_text(&self) -> bool {
        matches!(self, ContentPart::Text { .. })
    }

    /// True for `ImageUrl` parts.
    pub fn is_image(&self) -> bool {
        matches!(self, ContentPart::ImageUrl { .. })
    }
}

/// Image payload of an [`ContentPart::ImageUrl`] part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// `data:<mime>;base64,<bytes>` reference.
    pub url: String,
    /// Resolution/cost hint forwarded to the provider.
    pub detail: ImageDetail,
}

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Message content: plain text for system messages, an ordered part array
/// for multimodal user messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// System message with plain-string content.
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: Role::System,
            content: MessageContent::Text(content.into()),
        }
    }

    /// User message carrying an ordered content-part sequence.
    pub fn user(parts: Vec<ContentPart>) -> Self {
        Message {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Complete chat-completions request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

// ── Response side ────────────────────────────────────────────────────────

/// Parsed chat-completions response.
///
/// Every field defaults, so any JSON object deserialises; semantic
/// validation (e.g. "at least one choice") happens during normalisation,
/// not during decoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: TokenUsage,
}

/// One completion choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The assistant message inside a choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Named token counters from the provider. Missing counters default to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}
