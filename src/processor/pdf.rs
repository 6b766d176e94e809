//! PDFs through their embedded text layer.
//!
//! Used when the accelerated processor is disabled, and by the accelerated
//! processor itself when OCR is turned off. Scanned PDFs without a text
//! layer produce empty pages.

use super::{has_extension, reflow, require_path, InputRef, Processor};
use crate::config::ProcessorOptions;
use crate::error::ExtractError;
use crate::markup;
use crate::pipeline::render;
use crate::result::{ConversionResult, ConversionResultBuilder};
use async_trait::async_trait;
use std::path::Path;

const NAME: &str = "PdfProcessor";
const FORMATS: &[&str] = &[".pdf"];

#[derive(Debug, Clone, Default)]
pub struct PdfProcessor {
    options: ProcessorOptions,
}

impl PdfProcessor {
    pub fn new(options: ProcessorOptions) -> Self {
        Self { options }
    }
}

/// Text-layer extraction shared with the accelerated processor.
pub(crate) async fn text_layer(
    processor: &'static str,
    path: &Path,
    options: &ProcessorOptions,
) -> Result<ConversionResultBuilder, ExtractError> {
    let text = render::extract_text(processor, path).await?;
    let page_count = text.pages.len();

    let pages: Vec<String> = text
        .pages
        .iter()
        .map(|p| {
            let p = p.replace("\r\n", "\n");
            if options.preserve_layout {
                p.trim().to_string()
            } else {
                reflow(&p)
            }
        })
        .filter(|p| !p.is_empty())
        .collect();
    let content = pages.join("\n\n");
    let tables = markup::extract_tables(&content);

    let mut builder = ConversionResult::builder(processor, content)
        .metadata("content_type", "pdf")
        .metadata("source", path.display().to_string())
        .metadata("page_count", page_count);
    if let Some(title) = text.title {
        builder = builder.metadata("title", title);
    }
    Ok(builder.tables(tables))
}

#[async_trait]
impl Processor for PdfProcessor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supported_formats(&self) -> &'static [&'static str] {
        FORMATS
    }

    fn can_process(&self, input: &InputRef<'_>) -> bool {
        has_extension(input, FORMATS)
    }

    async fn process(&self, input: &InputRef<'_>) -> Result<ConversionResult, ExtractError> {
        let path = require_path(NAME, input)?;
        Ok(text_layer(NAME, path, &self.options)
            .await?
            .metadata("processing_mode", "text_layer")
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_pdf_files_only() {
        let p = PdfProcessor::default();
        assert!(p.can_process(&InputRef::Path(Path::new("a.PDF"))));
        assert!(!p.can_process(&InputRef::Path(Path::new("a.pdfx"))));
        assert!(!p.can_process(&InputRef::Url("https://x.org/a.pdf")));
    }

    #[tokio::test]
    async fn corrupt_pdf_fails_with_processor_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();

        // Fails at bind time without pdfium, at load time with it.
        let err = PdfProcessor::default()
            .process(&InputRef::Path(&path))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Conversion { ref processor, .. } if processor == NAME));
    }
}
