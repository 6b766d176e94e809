//! Configuration types for document extraction.
//!
//! All extraction behaviour is controlled through [`ExtractorConfig`], built
//! via its [`ExtractorConfigBuilder`]. The config is handed to
//! [`crate::Extractor::new`] exactly once; every processor receives the
//! subset it needs ([`ProcessorOptions`]) at construction time and there is
//! no global state.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for an [`crate::Extractor`].
///
/// # Example
/// ```rust
/// use edgequake_doc2llm::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .include_images(true)
///     .concurrency(4)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractorConfig {
    /// Keep the source line structure instead of reflowing paragraphs. Default: true.
    pub preserve_layout: bool,

    /// Keep image references (`![alt](src)`) when converting markup. Default: false.
    pub include_images: bool,

    /// Run the OCR engine on images and PDF pages. Default: true.
    ///
    /// When disabled the accelerated processor falls back to the PDF text
    /// layer and returns empty content for images.
    pub ocr_enabled: bool,

    /// Register the accelerated (VLM/OCR) processor. Default: true.
    pub accelerated: bool,

    /// Number of batch inputs processed at once. Default: 1 (sequential).
    ///
    /// Output order never depends on this value.
    pub concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Maximum rendered PDF page dimension in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Images larger than this (either side, pixels) are downscaled before OCR. Default: 2048.
    pub max_image_dimension: u32,

    /// LLM model identifier for the OCR engine, e.g. "gpt-4.1-nano".
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for OCR completions. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the OCR model may generate per image. Default: 4096.
    pub max_tokens: usize,

    /// Retry attempts on a failed OCR call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-OCR-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Custom transcription instruction. If None, uses the built-in one.
    pub ocr_instruction: Option<String>,

    /// Receives per-input batch events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            preserve_layout: true,
            include_images: false,
            ocr_enabled: true,
            accelerated: true,
            concurrency: 1,
            download_timeout_secs: 120,
            max_rendered_pixels: 2000,
            max_image_dimension: 2048,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            ocr_instruction: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("preserve_layout", &self.preserve_layout)
            .field("include_images", &self.include_images)
            .field("ocr_enabled", &self.ocr_enabled)
            .field("accelerated", &self.accelerated)
            .field("concurrency", &self.concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("max_image_dimension", &self.max_image_dimension)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("ocr_instruction", &self.ocr_instruction)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }

    /// The settings shared by every processor.
    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            preserve_layout: self.preserve_layout,
            include_images: self.include_images,
            ocr_enabled: self.ocr_enabled,
        }
    }
}

/// Builder for [`ExtractorConfig`].
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl fmt::Debug for ExtractorConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractorConfigBuilder {
    pub fn preserve_layout(mut self, v: bool) -> Self {
        self.config.preserve_layout = v;
        self
    }

    pub fn include_images(mut self, v: bool) -> Self {
        self.config.include_images = v;
        self
    }

    pub fn ocr_enabled(mut self, v: bool) -> Self {
        self.config.ocr_enabled = v;
        self
    }

    pub fn accelerated(mut self, v: bool) -> Self {
        self.config.accelerated = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn max_image_dimension(mut self, px: u32) -> Self {
        self.config.max_image_dimension = px.max(100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn ocr_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.ocr_instruction = Some(instruction.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, ExtractError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(ExtractError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.download_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Settings forwarded to every processor at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorOptions {
    pub preserve_layout: bool,
    pub include_images: bool,
    pub ocr_enabled: bool,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        ExtractorConfig::default().processor_options()
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Target format for rendering a [`crate::ConversionResult`] or a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown (default).
    #[default]
    Markdown,
    Html,
    Json,
    Text,
    Csv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            "json" => Ok(OutputFormat::Json),
            "text" | "txt" => Ok(OutputFormat::Text),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(ExtractError::InvalidConfig(format!(
                "Unknown output format '{other}' (expected markdown, html, json, text or csv)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractorConfig::default();
        assert!(c.preserve_layout);
        assert!(!c.include_images);
        assert!(c.ocr_enabled);
        assert!(c.accelerated);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.max_image_dimension, 2048);
    }

    #[test]
    fn builder_clamps() {
        let c = ExtractorConfig::builder()
            .concurrency(0)
            .temperature(9.0)
            .max_image_dimension(10)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.max_image_dimension, 100);
    }

    #[test]
    fn debug_lists_retry_and_instruction_settings() {
        let mut c = ExtractorConfig::builder().retry_backoff_ms(250).build().unwrap();
        c.ocr_instruction = Some("Transcribe.".into());
        let dbg = format!("{c:?}");
        for needle in ["retry_backoff_ms: 250", "max_tokens: 4096", "ocr_instruction: Some(\"Transcribe.\")"] {
            assert!(dbg.contains(needle), "missing {needle} in {dbg}");
        }
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let err = ExtractorConfig::builder()
            .download_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
    }

    #[test]
    fn processor_options_follow_config() {
        let c = ExtractorConfig::builder()
            .preserve_layout(false)
            .include_images(true)
            .ocr_enabled(false)
            .build()
            .unwrap();
        let o = c.processor_options();
        assert!(!o.preserve_layout);
        assert!(o.include_images);
        assert!(!o.ocr_enabled);
    }

    #[test]
    fn output_format_parse() {
        assert_eq!("markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("docx".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
    }

    #[test]
    fn debug_hides_provider() {
        let s = format!("{:?}", ExtractorConfig::default());
        assert!(s.contains("ExtractorConfig"));
        assert!(s.contains("concurrency"));
    }
}
