//! Configuration types for loading, context construction, and querying.
//!
//! Each pipeline layer has its own small, explicit config record, validated
//! at construction: [`LoaderConfig`] for rasterisation, [`ContextConfig`] for
//! content-model construction, and [`EngineConfig`] (built via
//! [`EngineConfigBuilder`]) combining both with the provider settings.
//!
//! # Design choice: builder over constructor
//! The engine config has a dozen knobs; the builder lets callers set only
//! what they care about and rely on documented defaults for the rest.
//! Enumerated options ([`ImageDetail`], [`ImageFormat`]) are real enums, so
//! an invalid value is rejected when the config is built, never at request
//! time.

use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provider hint controlling the resolution/cost trade-off for vision input.
///
/// Forwarded verbatim into every image content part. `High` instructs
/// GPT-4-class models to use the full image tile budget; without it fine
/// print and small tables are lost, which defeats the point of sending page
/// images at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    /// Single overview tile — cheapest, loses fine structure.
    Low,
    /// Full tile budget. (default)
    #[default]
    High,
    /// Let the provider decide.
    Auto,
}

impl ImageDetail {
    /// Wire-format string for this detail level.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageDetail::Low => "low",
            ImageDetail::High => "high",
            ImageDetail::Auto => "auto",
        }
    }
}

impl fmt::Display for ImageDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageDetail {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(ImageDetail::Low),
            "high" => Ok(ImageDetail::High),
            "auto" => Ok(ImageDetail::Auto),
            other => Err(QueryError::InvalidConfig(format!(
                "image detail must be 'low', 'high', or 'auto', got '{other}'"
            ))),
        }
    }
}

/// Encoding for rendered page images.
///
/// PNG is the default: lossless compression preserves text crispness, and
/// JPEG artefacts on rendered text measurably degrade what a vision model
/// can read. JPEG is available for callers who need smaller request bodies
/// on photo-heavy documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless PNG. (default)
    #[default]
    Png,
    /// Lossy JPEG — smaller payloads, softer text.
    Jpeg,
}

impl ImageFormat {
    /// MIME type used in the base64 data URI.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub(crate) fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

impl FromStr for ImageFormat {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            other => Err(QueryError::InvalidConfig(format!(
                "image format must be 'png' or 'jpeg', got '{other}'"
            ))),
        }
    }
}

/// Configuration for loading a PDF into a [`crate::Document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Rendering DPI used when rasterising each page. Range: 72–400. Default: 150.
    ///
    /// 150 DPI keeps text sharp enough for a vision model while keeping the
    /// base64 request body well below typical API upload limits. Increase to
    /// 200–300 for small-font documents.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap independent of DPI: a 150-DPI render of an A0 poster
    /// would otherwise produce a five-figure pixel width and exhaust memory.
    pub max_rendered_pixels: u32,

    /// Encoding for the rendered page images. Default: PNG.
    pub image_format: ImageFormat,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 2000,
            image_format: ImageFormat::default(),
        }
    }
}

/// Configuration for the content-model transformation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Custom system prompt. If `None`, the built-in citation-instruction
    /// template ([`crate::prompts::DEFAULT_SYSTEM_PROMPT`]) is used.
    pub system_prompt: Option<String>,

    /// Whether to emit extracted page text alongside page images. Default: true.
    ///
    /// When false, only the page label and image are emitted even for
    /// text-bearing pages. Text is additive, never a substitute: vision
    /// models still benefit from seeing the page layout.
    pub include_text_layer: bool,

    /// Detail level forwarded into every image part. Default: high.
    pub image_detail: ImageDetail,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            include_text_layer: true,
            image_detail: ImageDetail::default(),
        }
    }
}

/// Configuration for a [`crate::QueryEngine`].
///
/// Built via [`EngineConfig::builder()`] or [`EngineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfquery::{EngineConfig, ImageDetail};
///
/// let config = EngineConfig::builder()
///     .model("gpt-4o")
///     .dpi(150)
///     .image_detail(ImageDetail::High)
///     .max_tokens(2048)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct EngineConfig {
    /// API key for the provider. If `None`, the transport falls back to the
    /// `OPENAI_API_KEY` environment variable, and omits authentication
    /// entirely when neither is set (local OpenAI-compatible servers).
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    /// Default: `https://api.openai.com/v1`.
    /// Use `https://openrouter.ai/api/v1` for OpenRouter.
    pub base_url: String,

    /// Model identifier — must support vision. Default: "gpt-4o".
    /// For OpenRouter, use forms like "openai/gpt-4o" or
    /// "anthropic/claude-3.5-sonnet".
    pub model: String,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// Setting this too low silently truncates the answer; truncation is
    /// reported via [`crate::QueryResult::is_truncated`].
    pub max_tokens: u32,

    /// Sampling temperature. Default: 0.0 (clamped to 0–2).
    ///
    /// Zero makes the model deterministic and faithful to what is on the
    /// page — the right default for document question answering.
    pub temperature: f32,

    /// Per-call transport timeout in seconds. Default: 120.
    ///
    /// Vision requests carry megabytes of base64 and the provider has to
    /// process every page image, so this is deliberately generous. A
    /// timed-out call surfaces as a request-stage [`QueryError`].
    pub api_timeout_secs: u64,

    /// Echo the outgoing payload (base64 truncated) via `tracing` before
    /// sending. Debugging aid with no semantic impact. Default: false.
    pub verbose: bool,

    /// Document-loading settings (DPI, pixel cap, image encoding).
    pub loader: LoaderConfig,

    /// Content-model settings (system prompt, text layer, image detail).
    pub context: ContextConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
            api_timeout_secs: 120,
            verbose: false,
            loader: LoaderConfig::default(),
            context: ContextConfig::default(),
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("verbose", &self.verbose)
            .field("loader", &self.loader)
            .field("context", &self.context)
            .finish()
    }
}

impl EngineConfig {
    /// Create a new builder for `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn verbose(mut self, v: bool) -> Self {
        self.config.verbose = v;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.loader.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.loader.max_rendered_pixels = px.max(100);
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.config.loader.image_format = format;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.context.system_prompt = Some(prompt.into());
        self
    }

    pub fn include_text_layer(mut self, v: bool) -> Self {
        self.config.context.include_text_layer = v;
        self
    }

    pub fn image_detail(mut self, detail: ImageDetail) -> Self {
        self.config.context.image_detail = detail;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, QueryError> {
        let c = &self.config;
        if c.loader.dpi < 72 || c.loader.dpi > 400 {
            return Err(QueryError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.loader.dpi
            )));
        }
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(QueryError::InvalidConfig(format!(
                "temperature must be 0–2, got {}",
                c.temperature
            )));
        }
        if c.base_url.is_empty() {
            return Err(QueryError::InvalidConfig("base_url must not be empty".into()));
        }
        if c.model.is_empty() {
            return Err(QueryError::InvalidConfig("model must not be empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::builder().build().unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.loader.dpi, 150);
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.temperature, 0.0);
        assert!(config.context.include_text_layer);
        assert_eq!(config.context.image_detail, ImageDetail::High);
    }

    #[test]
    fn dpi_is_clamped() {
        let config = EngineConfig::builder().dpi(9999).build().unwrap();
        assert_eq!(config.loader.dpi, 400);
        let config = EngineConfig::builder().dpi(10).build().unwrap();
        assert_eq!(config.loader.dpi, 72);
    }

    #[test]
    fn temperature_is_clamped() {
        let config = EngineConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn image_detail_parse_rejects_unknown() {
        assert_eq!("low".parse::<ImageDetail>().unwrap(), ImageDetail::Low);
        assert_eq!("auto".parse::<ImageDetail>().unwrap(), ImageDetail::Auto);
        assert!("medium".parse::<ImageDetail>().is_err());
        assert!("HIGH".parse::<ImageDetail>().is_err());
    }

    #[test]
    fn image_format_parse_accepts_jpg_alias() {
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert!("webp".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = EngineConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn empty_model_rejected() {
        assert!(EngineConfig::builder().model("").build().is_err());
    }
}
