//! # edgequake-doc2llm
//!
//! Turn documents, web pages and raw text into LLM-ready Markdown, HTML,
//! plain text, JSON or CSV.
//!
//! ## Architecture
//!
//! ```text
//! input ──▶ Extractor (router) ──▶ Processor ──▶ ConversionResult ──▶ renderer
//!   │         │                      │                                 │
//!   │         ├─ images/PDF ───────▶ AcceleratedProcessor (VLM OCR)     ├─ markdown
//!   │         └─ first claimant ───▶ Docx / Spreadsheet / Html /        ├─ html
//!   │                                Presentation / Text / Url / …      ├─ text
//!   └─ batch: URL │ file │ text, partial failures recorded              ├─ json
//!                                                                       └─ csv
//! ```
//!
//! Processors only produce a [`ConversionResult`]; renderers only consume
//! one. Adding an input format never touches the renderers and vice versa.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2llm::{Extractor, ExtractorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = Extractor::new(&ExtractorConfig::default());
//!     let result = extractor.extract_file("quarterly.xlsx").await?;
//!     println!("{}", result.render_markdown());
//!     println!("{}", result.render_csv(true)?);
//!     Ok(())
//! }
//! ```
//!
//! Images and PDFs are transcribed by a vision LLM through `edgequake-llm`.
//! The provider is auto-detected from `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
//! … on first use; nothing is contacted when the extractor is built.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2llm` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! edgequake-doc2llm = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fields;
pub mod markup;
pub mod pipeline;
pub mod processor;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod result;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{extract_batch, BatchOutcome, BatchReport, BatchStatus, InputKind};
pub use config::{ExtractorConfig, ExtractorConfigBuilder, OutputFormat, ProcessorOptions};
pub use error::{ErrorKind, ExtractError, FailureRecord};
pub use extractor::{Extractor, ExtractorBuilder, TEXT_CONVERTER};
pub use fields::{FieldExtractor, HeuristicFieldExtractor};
pub use pipeline::ocr::{OcrEngine, VlmOcrEngine};
pub use processor::{InputRef, Processor};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use render::JsonRequest;
pub use result::{ConversionResult, ConversionResultBuilder, Metadata, Table};
pub use stream::{extract_stream, OutcomeStream};
