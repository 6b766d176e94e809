//! OCR pipeline stages behind the accelerated processor.
//!
//! ```text
//! PDF ──▶ render ──▶ DynamicImage ──▶ encode ──▶ ocr (VLM) ──▶ postprocess
//!        (pdfium)        ▲           (PNG/b64)   (retry)       (cleanup)
//! image file ────────────┘
//! ```
//!
//! 1. [`render`]: rasterise PDF pages or read their text layer; blocking
//!    pdfium work runs in `spawn_blocking`
//! 2. [`encode`]: downscale to the configured maximum and wrap as a base64
//!    PNG attachment
//! 3. [`ocr`]: the [`ocr::OcrEngine`] seam and its vision-LLM
//!    implementation, with retry, backoff and a per-call timeout
//! 4. [`postprocess`]: deterministic cleanup of the model's answer

pub mod encode;
pub mod ocr;
pub mod postprocess;
pub mod render;
