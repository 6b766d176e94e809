//! The router: resolves an input to one processor and runs it.
//!
//! ## Resolution
//!
//! 1. Image and PDF extensions go to the accelerated processor when one is
//!    registered, even if a regular processor also claims them.
//! 2. Otherwise the registry is scanned in insertion order and the first
//!    processor whose [`Processor::can_process`] returns true wins. The
//!    accelerated processor lives in its own slot and is never part of
//!    this scan, so each processor is asked at most once.
//! 3. No claimant → [`ExtractError::UnsupportedFormat`].
//!
//! The router holds no per-call state and never retries; processor errors
//! propagate unchanged.

use crate::batch::InputKind;
use crate::config::{ExtractorConfig, ProcessorOptions};
use crate::error::ExtractError;
use crate::pipeline::ocr::{OcrEngine, VlmOcrEngine};
use crate::processor::accelerated::ACCELERATED_FORMATS;
use crate::processor::{
    AcceleratedProcessor, DocxProcessor, HtmlProcessor, ImageProcessor, InputRef, PdfProcessor,
    PresentationProcessor, Processor, RawTextProcessor, SpreadsheetProcessor, TextProcessor,
    UrlProcessor,
};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::result::ConversionResult;
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// `metadata.processor` of results built from literal text.
pub const TEXT_CONVERTER: &str = "TextConverter";

/// Resolves inputs to processors and runs them.
///
/// Cheap to share: wrap it in an `Arc` and call it from any number of
/// tasks.
pub struct Extractor {
    processors: Vec<Arc<dyn Processor>>,
    accelerated: Option<Arc<dyn Processor>>,
    options: ProcessorOptions,
    concurrency: usize,
    progress: ProgressCallback,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field(
                "processors",
                &self.processors.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("accelerated", &self.accelerated.as_ref().map(|p| p.name()))
            .field("options", &self.options)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl Extractor {
    /// The default registry, with a vision-LLM OCR engine behind the
    /// accelerated processor when `config.accelerated` is set.
    ///
    /// No provider is contacted here; credentials are resolved on the
    /// first OCR call.
    pub fn new(config: &ExtractorConfig) -> Self {
        let engine: Arc<dyn OcrEngine> = Arc::new(VlmOcrEngine::from_config(config));
        Self::with_ocr_engine(config, engine)
    }

    /// The default registry with a caller-supplied OCR engine.
    pub fn with_ocr_engine(config: &ExtractorConfig, engine: Arc<dyn OcrEngine>) -> Self {
        let options = config.processor_options();
        let mut builder = Self::builder()
            .options(options)
            .concurrency(config.concurrency)
            .processor(Arc::new(PdfProcessor::new(options)))
            .processor(Arc::new(DocxProcessor::new(options)))
            .processor(Arc::new(TextProcessor::new(options)))
            .processor(Arc::new(SpreadsheetProcessor::new(options)))
            .processor(Arc::new(HtmlProcessor::new(options)))
            .processor(Arc::new(PresentationProcessor::new(options)))
            .processor(Arc::new(ImageProcessor::new()))
            .processor(Arc::new(UrlProcessor::new(options, config.download_timeout_secs)))
            .processor(Arc::new(RawTextProcessor::new(options)));

        if config.accelerated {
            builder = builder.accelerated(Arc::new(AcceleratedProcessor::new(
                engine,
                options,
                config.max_rendered_pixels,
            )));
        }
        if let Some(ref cb) = config.progress_callback {
            builder = builder.progress(Arc::clone(cb));
        }
        builder.build()
    }

    /// An empty registry, for custom processor sets.
    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::default()
    }

    pub(crate) fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub(crate) fn progress(&self) -> &ProgressCallback {
        &self.progress
    }

    /// The processor that would handle `path`, if any.
    pub fn resolve(&self, path: &Path) -> Option<&dyn Processor> {
        let input = InputRef::Path(path);

        if let Some(ref accelerated) = self.accelerated {
            let ext = input.extension().unwrap_or_default();
            if ACCELERATED_FORMATS
                .iter()
                .any(|f| f.trim_start_matches('.') == ext)
            {
                return Some(accelerated.as_ref());
            }
        }

        self.processors
            .iter()
            .find(|p| p.can_process(&input))
            .map(|p| p.as_ref())
    }

    /// Convert a local file.
    pub async fn extract_file(&self, path: impl AsRef<Path>) -> Result<ConversionResult, ExtractError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ExtractError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let processor = self
            .resolve(path)
            .ok_or_else(|| ExtractError::UnsupportedFormat {
                input: path.display().to_string(),
            })?;
        info!("Routing {} → {}", path.display(), processor.name());

        processor.process(&InputRef::Path(path)).await
    }

    /// Fetch and convert a URL.
    pub async fn extract_url(&self, url: &str) -> Result<ConversionResult, ExtractError> {
        let input = InputRef::Url(url);
        let processor = self
            .processors
            .iter()
            .find(|p| p.can_process(&input))
            .ok_or_else(|| ExtractError::conversion("Extractor", "URL processor not available"))?;
        info!("Routing {} → {}", url, processor.name());

        processor.process(&input).await
    }

    /// Wrap literal text as a result. Never fails and never sniffs the
    /// text for a format.
    pub fn extract_text(&self, text: impl Into<String>) -> ConversionResult {
        ConversionResult::builder(TEXT_CONVERTER, text)
            .metadata("content_type", "text")
            .metadata("preserve_layout", self.options.preserve_layout)
            .metadata("processing_mode", "local")
            .build()
    }

    /// Convert in-memory file contents.
    ///
    /// `file_name` only supplies the extension used for routing; the bytes
    /// are written to a managed temp file that is removed on return.
    pub async fn extract_bytes(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<ConversionResult, ExtractError> {
        let suffix = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let mut tmp = tempfile::Builder::new()
            .prefix("doc2llm-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
        tmp.write_all(bytes)
            .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;
        debug!("Buffered {} bytes of '{}' at {}", bytes.len(), file_name, tmp.path().display());

        // `tmp` is deleted when it drops after the conversion.
        self.extract_file(tmp.path()).await
    }

    /// Classify `input` as URL, file or literal text and convert it.
    pub async fn extract_input(
        &self,
        input: &str,
    ) -> Result<(InputKind, ConversionResult), ExtractError> {
        let kind = InputKind::classify(input);
        debug!("Classified '{}' as {:?}", input, kind);
        let result = match kind {
            InputKind::Url => self.extract_url(input).await?,
            InputKind::File => self.extract_file(input).await?,
            InputKind::Text => self.extract_text(input),
        };
        Ok((kind, result))
    }

    /// Every format token the registered processors declare.
    pub fn supported_formats(&self) -> HashSet<String> {
        self.processors
            .iter()
            .chain(self.accelerated.iter())
            .flat_map(|p| p.supported_formats().iter())
            .map(|f| f.to_string())
            .collect()
    }

    /// Names of the registered processors, accelerated first.
    pub fn processor_names(&self) -> Vec<&'static str> {
        self.accelerated
            .iter()
            .chain(self.processors.iter())
            .map(|p| p.name())
            .collect()
    }
}

/// Assembles an [`Extractor`] from explicit processors.
pub struct ExtractorBuilder {
    processors: Vec<Arc<dyn Processor>>,
    accelerated: Option<Arc<dyn Processor>>,
    options: ProcessorOptions,
    concurrency: usize,
    progress: Option<ProgressCallback>,
}

impl Default for ExtractorBuilder {
    fn default() -> Self {
        Self {
            processors: Vec::new(),
            accelerated: None,
            options: ProcessorOptions::default(),
            concurrency: 1,
            progress: None,
        }
    }
}

impl ExtractorBuilder {
    /// Append a processor to the capability scan.
    pub fn processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Set the processor that takes every image and PDF input.
    pub fn accelerated(mut self, processor: Arc<dyn Processor>) -> Self {
        self.accelerated = Some(processor);
        self
    }

    pub fn options(mut self, options: ProcessorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    pub fn build(self) -> Extractor {
        Extractor {
            processors: self.processors,
            accelerated: self.accelerated,
            options: self.options,
            concurrency: self.concurrency,
            progress: self
                .progress
                .unwrap_or_else(|| Arc::new(NoopProgressCallback)),
        }
    }
}
