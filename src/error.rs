//! Error types for the edgequake-doc2llm library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`]: **fatal for one call**. The input could not be
//!   converted or the requested rendering cannot be produced. Returned as
//!   `Err(ExtractError)` from the router, the processors, and the renderers.
//!
//! * [`FailureRecord`]: **non-fatal for a batch**. One input failed but the
//!   others are fine. Stored inside [`crate::batch::BatchOutcome`] so the
//!   combined output can still be produced alongside an error manifest.
//!
//! Only the batch orchestrator turns the first kind into the second; every
//! other layer propagates `ExtractError` unchanged.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-doc2llm library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path (checked on every call).
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// No registered processor claims the input.
    #[error("Unsupported format: no processor found for '{input}'")]
    UnsupportedFormat { input: String },

    // ── Processing errors ─────────────────────────────────────────────────
    /// A claiming processor failed, or a required processor is missing.
    #[error("Conversion error in {processor}: {detail}")]
    Conversion { processor: String, detail: String },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// CSV rendering was requested on a result without tables.
    #[error("No tables found in the document")]
    NoTablesFound,

    /// Field- or schema-guided JSON extraction failed.
    #[error("Field extraction failed: {detail}")]
    FieldExtraction { detail: String },

    // ── Batch errors ──────────────────────────────────────────────────────
    /// Every input of a batch failed; there is nothing to render.
    #[error("All {total} inputs failed.\nFirst error: {first_error}")]
    AllInputsFailed { total: usize, first_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Shorthand for [`ExtractError::Conversion`].
    pub fn conversion(processor: impl Into<String>, detail: impl ToString) -> Self {
        ExtractError::Conversion {
            processor: processor.into(),
            detail: detail.to_string(),
        }
    }

    /// The manifest category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::FileNotFound { .. } => ErrorKind::FileNotFound,
            ExtractError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            ExtractError::Conversion { .. } => ErrorKind::Conversion,
            ExtractError::NoTablesFound => ErrorKind::NoTablesFound,
            ExtractError::FieldExtraction { .. } => ErrorKind::FieldExtraction,
            _ => ErrorKind::Other,
        }
    }
}

/// Coarse error category recorded in a batch failure manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileNotFound,
    UnsupportedFormat,
    Conversion,
    NoTablesFound,
    FieldExtraction,
    Other,
}

/// A non-fatal error for a single batch input.
///
/// The batch continues after recording it; `index` is the 0-based position
/// of the input in the original request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{input}: {message}")]
pub struct FailureRecord {
    pub index: usize,
    pub input: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl FailureRecord {
    pub fn new(index: usize, input: impl Into<String>, err: &ExtractError) -> Self {
        Self {
            index,
            input: input.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_display() {
        let e = ExtractError::FileNotFound {
            path: PathBuf::from("/tmp/missing.pdf"),
        };
        assert!(e.to_string().contains("/tmp/missing.pdf"));
        assert_eq!(e.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn conversion_shorthand() {
        let e = ExtractError::conversion("UrlProcessor", "HTTP 404");
        let msg = e.to_string();
        assert!(msg.contains("UrlProcessor"), "got: {msg}");
        assert!(msg.contains("HTTP 404"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::Conversion);
    }

    #[test]
    fn all_inputs_failed_display() {
        let e = ExtractError::AllInputsFailed {
            total: 3,
            first_error: "boom".into(),
        };
        assert!(e.to_string().contains("All 3 inputs"));
        assert_eq!(e.kind(), ErrorKind::Other);
    }

    #[test]
    fn failure_record_from_error() {
        let e = ExtractError::UnsupportedFormat {
            input: "data.xyz".into(),
        };
        let rec = FailureRecord::new(1, "data.xyz", &e);
        assert_eq!(rec.index, 1);
        assert_eq!(rec.kind, ErrorKind::UnsupportedFormat);
        assert!(rec.to_string().starts_with("data.xyz: "));
    }

    #[test]
    fn error_kind_serialises_snake_case() {
        let v = serde_json::to_value(ErrorKind::NoTablesFound).unwrap();
        assert_eq!(v, serde_json::json!("no_tables_found"));
    }
}
