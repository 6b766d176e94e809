//! OCR-backed processor for images and PDFs.
//!
//! The router hands it every image and PDF input before consulting the
//! regular registry. Pages and images are transcribed by an
//! [`OcrEngine`]; the engine never fails, so an unreachable model yields
//! an empty page rather than an error.

use super::image::IMAGE_FORMATS;
use super::pdf::text_layer;
use super::{has_extension, require_path, run_blocking, InputRef, Processor};
use crate::config::ProcessorOptions;
use crate::error::ExtractError;
use crate::markup;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::render;
use crate::result::ConversionResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub const NAME: &str = "AcceleratedProcessor";

/// Extensions routed to the accelerated processor whenever it is registered.
pub const ACCELERATED_FORMATS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".bmp", ".tiff", ".webp", ".gif", ".pdf",
];

pub struct AcceleratedProcessor {
    engine: Arc<dyn OcrEngine>,
    options: ProcessorOptions,
    max_rendered_pixels: u32,
}

impl std::fmt::Debug for AcceleratedProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceleratedProcessor")
            .field("options", &self.options)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .finish_non_exhaustive()
    }
}

impl AcceleratedProcessor {
    pub fn new(engine: Arc<dyn OcrEngine>, options: ProcessorOptions, max_rendered_pixels: u32) -> Self {
        Self {
            engine,
            options,
            max_rendered_pixels,
        }
    }

    async fn transcribe_image(&self, path: &Path) -> Result<ConversionResult, ExtractError> {
        let source = path.display().to_string();
        if !self.options.ocr_enabled {
            debug!("OCR disabled; {} yields no text", source);
            return Ok(ConversionResult::builder(NAME, "")
                .metadata("content_type", "image")
                .metadata("source", source)
                .metadata("ocr_performed", false)
                .metadata("processing_mode", "passthrough")
                .build());
        }

        let owned: PathBuf = path.to_path_buf();
        let image = run_blocking(NAME, move || {
            image::open(&owned)
                .map_err(|e| ExtractError::conversion(NAME, format!("cannot read image: {e}")))
        })
        .await?;
        let (width, height) = (image.width(), image.height());

        let text = self.engine.transcribe(&image).await;
        let tables = markup::extract_tables(&text);

        Ok(ConversionResult::builder(NAME, text)
            .metadata("content_type", "image")
            .metadata("source", source)
            .metadata("width", width)
            .metadata("height", height)
            .metadata("ocr_performed", true)
            .metadata("processing_mode", "ocr")
            .tables(tables)
            .build())
    }

    async fn transcribe_pdf(&self, path: &Path) -> Result<ConversionResult, ExtractError> {
        if !self.options.ocr_enabled {
            debug!("OCR disabled; reading text layer of {}", path.display());
            return Ok(text_layer(NAME, path, &self.options)
                .await?
                .metadata("ocr_performed", false)
                .metadata("processing_mode", "text_layer")
                .build());
        }

        let pages = render::render_pages(NAME, path, self.max_rendered_pixels).await?;
        let page_count = pages.len();

        // Sequential: one VLM call in flight per document keeps page order
        // trivial and leaves parallelism to the batch layer.
        let mut texts = Vec::with_capacity(page_count);
        for (idx, page) in pages.iter().enumerate() {
            let text = self.engine.transcribe(page).await;
            debug!("Page {}/{} → {} chars", idx + 1, page_count, text.len());
            if !text.is_empty() {
                texts.push(text);
            }
        }
        let content = texts.join("\n\n");
        let tables = markup::extract_tables(&content);

        Ok(ConversionResult::builder(NAME, content)
            .metadata("content_type", "pdf")
            .metadata("source", path.display().to_string())
            .metadata("page_count", page_count)
            .metadata("ocr_performed", true)
            .metadata("processing_mode", "ocr")
            .tables(tables)
            .build())
    }
}

#[async_trait]
impl Processor for AcceleratedProcessor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supported_formats(&self) -> &'static [&'static str] {
        ACCELERATED_FORMATS
    }

    fn can_process(&self, input: &InputRef<'_>) -> bool {
        has_extension(input, ACCELERATED_FORMATS)
    }

    async fn process(&self, input: &InputRef<'_>) -> Result<ConversionResult, ExtractError> {
        let path = require_path(NAME, input)?;
        let start = Instant::now();
        let result = if has_extension(input, IMAGE_FORMATS) {
            self.transcribe_image(path).await?
        } else {
            self.transcribe_pdf(path).await?
        };
        info!(
            "Accelerated conversion of {} took {:?}",
            path.display(),
            start.elapsed()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingOcr {
        calls: AtomicUsize,
        reply: &'static str,
    }

    #[async_trait]
    impl OcrEngine for CountingOcr {
        async fn transcribe(&self, _image: &DynamicImage) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.to_string()
        }
    }

    fn processor(reply: &'static str, ocr_enabled: bool) -> (AcceleratedProcessor, Arc<CountingOcr>) {
        let engine = Arc::new(CountingOcr {
            calls: AtomicUsize::new(0),
            reply,
        });
        let options = ProcessorOptions {
            ocr_enabled,
            ..ProcessorOptions::default()
        };
        (AcceleratedProcessor::new(engine.clone(), options, 2000), engine)
    }

    fn png(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("scan.png");
        image::RgbImage::new(4, 4).save(&path).unwrap();
        path
    }

    #[test]
    fn format_set_covers_images_and_pdf() {
        let (p, _) = processor("", true);
        for name in ["a.jpg", "b.JPEG", "c.png", "d.bmp", "e.tiff", "f.webp", "g.gif", "h.pdf"] {
            assert!(p.can_process(&InputRef::Path(Path::new(name))), "{name}");
        }
        assert!(!p.can_process(&InputRef::Path(Path::new("a.docx"))));
    }

    #[tokio::test]
    async fn image_is_transcribed_with_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = png(&dir);
        let (p, engine) = processor("Total\n\n<table><tr><td>a</td><td>1</td></tr></table>", true);

        let r = p.process(&InputRef::Path(&path)).await.unwrap();
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        assert_eq!(r.processor(), NAME);
        assert!(r.content().starts_with("Total"));
        assert_eq!(r.tables().len(), 1);
        assert_eq!(r.metadata().get("ocr_performed"), Some(&serde_json::json!(true)));
    }

    #[tokio::test]
    async fn empty_transcription_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = png(&dir);
        let (p, _) = processor("", true);

        let r = p.process(&InputRef::Path(&path)).await.unwrap();
        assert_eq!(r.content(), "");
        assert!(r.tables().is_empty());
    }

    #[tokio::test]
    async fn ocr_disabled_skips_the_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = png(&dir);
        let (p, engine) = processor("never", false);

        let r = p.process(&InputRef::Path(&path)).await.unwrap();
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
        assert_eq!(r.content(), "");
        assert_eq!(r.metadata().get_str("processing_mode"), Some("passthrough"));
    }
}
