//! PDF access through pdfium: page rasterisation and the embedded text layer.
//!
//! pdfium keeps thread-local state and blocks, so every entry point here
//! moves its work onto the blocking pool with `spawn_blocking`.
//!
//! The shared library is bound at runtime, first from `PDFIUM_LIB_PATH`
//! (a file or a directory), then from the working directory, then from the
//! system loader path.

use crate::error::ExtractError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Text layer of a PDF, one entry per page.
#[derive(Debug, Clone, Default)]
pub struct PdfText {
    pub pages: Vec<String>,
    pub title: Option<String>,
}

/// Bind the pdfium shared library.
pub fn bind_pdfium() -> Result<Pdfium, String> {
    let mut tried = Vec::new();

    if let Ok(custom) = std::env::var("PDFIUM_LIB_PATH") {
        let custom = PathBuf::from(custom);
        let candidate = if custom.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&custom)
        } else {
            custom
        };
        match Pdfium::bind_to_library(&candidate) {
            Ok(bindings) => return Ok(Pdfium::new(bindings)),
            Err(e) => tried.push(format!("{}: {e:?}", candidate.display())),
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&local) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(e) => tried.push(format!("{}: {e:?}", local.display())),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(e) => {
            tried.push(format!("system library: {e:?}"));
            Err(format!(
                "pdfium library not found (set PDFIUM_LIB_PATH). Tried: {}",
                tried.join("; ")
            ))
        }
    }
}

fn open_error(processor: &str, path: &Path, e: PdfiumError) -> ExtractError {
    let detail = format!("{e:?}");
    if detail.to_lowercase().contains("password") {
        ExtractError::conversion(processor, format!("'{}' is password protected", path.display()))
    } else {
        ExtractError::conversion(processor, format!("cannot open '{}': {detail}", path.display()))
    }
}

/// Rasterise every page so its longest side is at most `max_pixels`.
pub async fn render_pages(
    processor: &'static str,
    pdf_path: &Path,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, ExtractError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || render_pages_blocking(processor, &path, max_pixels))
        .await
        .map_err(|e| ExtractError::conversion(processor, format!("render task failed: {e}")))?
}

fn render_pages_blocking(
    processor: &str,
    pdf_path: &Path,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, ExtractError> {
    let pdfium = bind_pdfium().map_err(|e| ExtractError::conversion(processor, e))?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| open_error(processor, pdf_path, e))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let pages = document.pages();
    info!("Rasterising {} pages of {}", pages.len(), pdf_path.display());

    let mut images = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ExtractError::conversion(processor, format!("page {} failed to render: {e:?}", idx + 1))
        })?;
        let image = bitmap.as_image();
        debug!("Rendered page {} → {}x{} px", idx + 1, image.width(), image.height());
        images.push(image);
    }
    Ok(images)
}

/// Read the embedded text layer of every page.
pub async fn extract_text(processor: &'static str, pdf_path: &Path) -> Result<PdfText, ExtractError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_text_blocking(processor, &path))
        .await
        .map_err(|e| ExtractError::conversion(processor, format!("text task failed: {e}")))?
}

fn extract_text_blocking(processor: &str, pdf_path: &Path) -> Result<PdfText, ExtractError> {
    let pdfium = bind_pdfium().map_err(|e| ExtractError::conversion(processor, e))?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| open_error(processor, pdf_path, e))?;

    let title = document
        .metadata()
        .get(PdfDocumentMetadataTagType::Title)
        .map(|t| t.value().trim().to_string())
        .filter(|t| !t.is_empty());

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page.text().map_err(|e| {
            ExtractError::conversion(processor, format!("page {} has no readable text layer: {e:?}", idx + 1))
        })?;
        pages.push(text.all());
    }
    debug!("Read text layer of {} pages from {}", pages.len(), pdf_path.display());

    Ok(PdfText { pages, title })
}
