//! The OCR collaborator: image in, transcription out.
//!
//! [`OcrEngine`] is the seam the accelerated processor depends on.
//! [`VlmOcrEngine`] implements it with a vision LLM from `edgequake-llm`.
//!
//! ## Failure contract
//!
//! `transcribe` never fails. A missing provider, an API error after the
//! last retry, a timeout or an encoding error is logged at `warn` and
//! yields `""`; callers treat an empty transcription as "no content".
//!
//! ## Retry strategy
//!
//! Exponential backoff (`retry_backoff_ms * 2^attempt`): with a 500 ms
//! base and 3 retries the waits are 500 ms, 1 s and 2 s. Each attempt is
//! bounded by `api_timeout_secs`.

use crate::config::ExtractorConfig;
use crate::pipeline::{encode, postprocess};
use crate::prompts::{OCR_INSTRUCTION, OCR_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::DynamicImage;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Transcribes a document image to text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Extracted text, or `""` when nothing could be extracted.
    async fn transcribe(&self, image: &DynamicImage) -> String;
}

/// Provider selection and request knobs for [`VlmOcrEngine`].
#[derive(Clone)]
pub struct OcrSettings {
    pub provider: Option<Arc<dyn LLMProvider>>,
    pub provider_name: Option<String>,
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub api_timeout_secs: u64,
    pub max_image_dimension: u32,
    pub instruction: Option<String>,
}

impl From<&ExtractorConfig> for OcrSettings {
    fn from(c: &ExtractorConfig) -> Self {
        Self {
            provider: c.provider.clone(),
            provider_name: c.provider_name.clone(),
            model: c.model.clone(),
            temperature: c.temperature,
            max_tokens: c.max_tokens,
            max_retries: c.max_retries,
            retry_backoff_ms: c.retry_backoff_ms,
            api_timeout_secs: c.api_timeout_secs,
            max_image_dimension: c.max_image_dimension,
            instruction: c.ocr_instruction.clone(),
        }
    }
}

/// Vision-LLM OCR. The provider is resolved on first use and cached, so
/// building an extractor never needs credentials.
pub struct VlmOcrEngine {
    settings: OcrSettings,
    provider: OnceCell<Result<Arc<dyn LLMProvider>, String>>,
}

impl std::fmt::Debug for VlmOcrEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VlmOcrEngine")
            .field("provider_name", &self.settings.provider_name)
            .field("model", &self.settings.model)
            .field("max_retries", &self.settings.max_retries)
            .finish()
    }
}

impl VlmOcrEngine {
    pub fn new(settings: OcrSettings) -> Self {
        Self {
            settings,
            provider: OnceCell::new(),
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(OcrSettings::from(config))
    }

    fn provider(&self) -> Result<&Arc<dyn LLMProvider>, &str> {
        self.provider
            .get_or_init(|| resolve_provider(&self.settings))
            .as_ref()
            .map_err(String::as_str)
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.settings.temperature),
            max_tokens: Some(self.settings.max_tokens),
            ..Default::default()
        }
    }

    async fn prepare(&self, image: &DynamicImage) -> Result<edgequake_llm::ImageData, String> {
        let img = image.clone();
        let max = self.settings.max_image_dimension;
        tokio::task::spawn_blocking(move || encode::encode_image(&encode::fit_within(img, max)))
            .await
            .map_err(|e| format!("encode task failed: {e}"))?
            .map_err(|e| format!("image encoding failed: {e}"))
    }
}

#[async_trait]
impl OcrEngine for VlmOcrEngine {
    async fn transcribe(&self, image: &DynamicImage) -> String {
        let start = Instant::now();

        let provider = match self.provider() {
            Ok(p) => Arc::clone(p),
            Err(e) => {
                warn!("OCR unavailable: {}", e);
                return String::new();
            }
        };

        let image_data = match self.prepare(image).await {
            Ok(d) => d,
            Err(e) => {
                warn!("OCR skipped: {}", e);
                return String::new();
            }
        };

        let instruction = self.settings.instruction.as_deref().unwrap_or(OCR_INSTRUCTION);
        let messages = vec![
            ChatMessage::system(OCR_SYSTEM_PROMPT),
            ChatMessage::user_with_images(instruction, vec![image_data]),
        ];
        let options = self.options();
        let limit = Duration::from_secs(self.settings.api_timeout_secs);

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.settings.retry_backoff_ms, attempt);
                warn!("OCR retry {}/{} after {}ms", attempt, self.settings.max_retries, backoff);
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(limit, provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "OCR: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return postprocess::clean_transcription(&response.content);
                }
                Ok(Err(e)) => warn!("OCR attempt {} failed: {}", attempt + 1, e),
                Err(_) => warn!(
                    "OCR attempt {} timed out after {}s",
                    attempt + 1,
                    self.settings.api_timeout_secs
                ),
            }
        }

        warn!(
            "OCR gave up after {} attempts; treating image as empty",
            self.settings.max_retries + 1
        );
        String::new()
    }
}

/// Delay before retry `attempt` (1-based), saturating at `u64::MAX`.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    2u64.checked_pow(attempt.saturating_sub(1))
        .map_or(u64::MAX, |factor| base.saturating_mul(factor))
}

fn create_vision_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, String> {
    ProviderFactory::create_llm_provider(name, model)
        .map_err(|e| format!("provider '{name}' could not be created: {e}"))
}

/// Resolve the LLM provider, most specific source first:
///
/// 1. a pre-built provider,
/// 2. a provider name (model defaults to [`DEFAULT_MODEL`]),
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set,
/// 4. OpenAI when `OPENAI_API_KEY` is set,
/// 5. whatever `ProviderFactory::from_env` detects.
fn resolve_provider(settings: &OcrSettings) -> Result<Arc<dyn LLMProvider>, String> {
    if let Some(ref provider) = settings.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = settings.provider_name {
        let model = settings.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        let model = settings.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider("openai", model);
    }

    let (llm, _embedding) = ProviderFactory::from_env().map_err(|e| {
        format!(
            "no LLM provider could be auto-detected; set OPENAI_API_KEY, ANTHROPIC_API_KEY \
             or configure a provider ({e})"
        )
    })?;
    Ok(llm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let config = ExtractorConfig::builder()
            .model("gpt-4.1-mini")
            .max_retries(1)
            .api_timeout_secs(5)
            .max_image_dimension(1024)
            .build()
            .unwrap();
        let s = OcrSettings::from(&config);
        assert_eq!(s.model.as_deref(), Some("gpt-4.1-mini"));
        assert_eq!(s.max_retries, 1);
        assert_eq!(s.api_timeout_secs, 5);
        assert_eq!(s.max_image_dimension, 1024);
        assert!(s.instruction.is_none());
    }

    #[test]
    fn options_carry_sampling_settings() {
        let engine = VlmOcrEngine::from_config(&ExtractorConfig::default());
        let opts = engine.options();
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 3), 2000);
        assert_eq!(backoff_ms(500, 64), u64::MAX);
        assert_eq!(backoff_ms(500, u32::MAX), u64::MAX);
        assert_eq!(backoff_ms(u64::MAX, 2), u64::MAX);
    }

    #[test]
    fn engine_construction_does_not_resolve_provider() {
        let engine = VlmOcrEngine::from_config(&ExtractorConfig::default());
        assert!(engine.provider.get().is_none());
    }
}
