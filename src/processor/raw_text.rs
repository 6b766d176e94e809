//! Fallback for text-based formats no dedicated processor claims.
//!
//! Prose formats pass through; structured formats are wrapped in a fenced
//! code block tagged with their language so Markdown consumers keep the
//! layout intact.

use super::text::read_text;
use super::{has_extension, require_path, InputRef, Processor};
use crate::config::ProcessorOptions;
use crate::error::ExtractError;
use crate::result::ConversionResult;
use async_trait::async_trait;

const NAME: &str = "RawTextProcessor";
const FORMATS: &[&str] = &[
    ".md", ".markdown", ".rst", ".log", ".tex", ".json", ".xml", ".yaml", ".yml", ".toml",
    ".ini", ".cfg", ".conf", ".tsv",
];

#[derive(Debug, Clone, Default)]
pub struct RawTextProcessor {
    options: ProcessorOptions,
}

impl RawTextProcessor {
    pub fn new(options: ProcessorOptions) -> Self {
        Self { options }
    }
}

/// Fence language for structured formats; `None` for prose.
fn fence_language(ext: &str) -> Option<&'static str> {
    match ext {
        "json" => Some("json"),
        "xml" => Some("xml"),
        "yaml" | "yml" => Some("yaml"),
        "toml" => Some("toml"),
        "ini" | "cfg" | "conf" => Some("ini"),
        "tsv" => Some("tsv"),
        _ => None,
    }
}

#[async_trait]
impl Processor for RawTextProcessor {
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
        let raw = read_text(NAME, path).await?;
        let ext = input.extension().unwrap_or_default();
        let body = raw.trim_end();

        let content = match fence_language(&ext) {
            Some(lang) if !body.is_empty() => format!("```{lang}\n{body}\n```"),
            _ => body.to_string(),
        };

        Ok(ConversionResult::builder(NAME, content)
            .metadata("content_type", "text")
            .metadata("source", path.display().to_string())
            .metadata("file_type", ext)
            .metadata("preserve_layout", self.options.preserve_layout)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[tokio::test]
    async fn markdown_passes_through() {
        let f = write_tmp(".md", "# Notes\n\n- a\n");
        let r = RawTextProcessor::default()
            .process(&InputRef::Path(f.path()))
            .await
            .unwrap();
        assert_eq!(r.content(), "# Notes\n\n- a");
        assert_eq!(r.metadata().get_str("file_type"), Some("md"));
    }

    #[tokio::test]
    async fn structured_formats_are_fenced() {
        let f = write_tmp(".json", "{\"a\": 1}\n");
        let r = RawTextProcessor::default()
            .process(&InputRef::Path(f.path()))
            .await
            .unwrap();
        assert_eq!(r.content(), "```json\n{\"a\": 1}\n```");
    }

    #[tokio::test]
    async fn missing_file_is_a_conversion_error() {
        let err = RawTextProcessor::default()
            .process(&InputRef::Path(std::path::Path::new("/nonexistent/x.md")))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Conversion { .. }));
    }
}
