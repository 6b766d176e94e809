//! Images without OCR: records dimensions, extracts no text.
//!
//! Only reached when the accelerated processor is not registered; with it,
//! image formats always route there.

use super::{has_extension, require_path, run_blocking, InputRef, Processor};
use crate::error::ExtractError;
use crate::result::ConversionResult;
use async_trait::async_trait;
use std::path::PathBuf;

const NAME: &str = "ImageProcessor";
pub(crate) const IMAGE_FORMATS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".bmp", ".tiff", ".tif", ".webp", ".gif",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Processor for ImageProcessor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supported_formats(&self) -> &'static [&'static str] {
        IMAGE_FORMATS
    }

    fn can_process(&self, input: &InputRef<'_>) -> bool {
        has_extension(input, IMAGE_FORMATS)
    }

    async fn process(&self, input: &InputRef<'_>) -> Result<ConversionResult, ExtractError> {
        let path: PathBuf = require_path(NAME, input)?.to_path_buf();
        let source = path.display().to_string();
        let (width, height) = run_blocking(NAME, move || {
            image::image_dimensions(&path)
                .map_err(|e| ExtractError::conversion(NAME, format!("cannot read image: {e}")))
        })
        .await?;

        Ok(ConversionResult::builder(NAME, "")
            .metadata("content_type", "image")
            .metadata("source", source)
            .metadata("width", width)
            .metadata("height", height)
            .metadata("ocr_performed", false)
            .build())
    }
}
