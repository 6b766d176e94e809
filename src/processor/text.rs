//! Plain-text files.

use super::{has_extension, reflow, require_path, InputRef, Processor};
use crate::config::ProcessorOptions;
use crate::error::ExtractError;
use crate::result::ConversionResult;
use async_trait::async_trait;
use tracing::debug;

const NAME: &str = "TextProcessor";
const FORMATS: &[&str] = &[".txt", ".text"];

/// Reads `.txt` files, decoding invalid UTF-8 lossily.
#[derive(Debug, Clone, Default)]
pub struct TextProcessor {
    options: ProcessorOptions,
}

impl TextProcessor {
    pub fn new(options: ProcessorOptions) -> Self {
        Self { options }
    }
}

/// Read a file as text. Invalid UTF-8 sequences become U+FFFD.
pub(crate) async fn read_text(processor: &str, path: &std::path::Path) -> Result<String, ExtractError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ExtractError::conversion(processor, format!("cannot read '{}': {e}", path.display())))?;
    let text = String::from_utf8_lossy(&bytes);
    // Strip a UTF-8 BOM if present.
    Ok(text.trim_start_matches('\u{FEFF}').replace("\r\n", "\n"))
}

#[async_trait]
impl Processor for TextProcessor {
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
        debug!("Read {} bytes of text from {}", raw.len(), path.display());

        let content = if self.options.preserve_layout {
            raw.trim_end().to_string()
        } else {
            reflow(&raw)
        };

        Ok(ConversionResult::builder(NAME, content)
            .metadata("content_type", "text")
            .metadata("source", path.display().to_string())
            .metadata("preserve_layout", self.options.preserve_layout)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    fn write_tmp(suffix: &str, body: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(body).unwrap();
        f
    }

    #[test]
    fn claims_txt_only() {
        let p = TextProcessor::default();
        assert!(p.can_process(&InputRef::Path(Path::new("notes.TXT"))));
        assert!(p.can_process(&InputRef::Path(Path::new("notes.text"))));
        assert!(!p.can_process(&InputRef::Path(Path::new("notes.md"))));
        assert!(!p.can_process(&InputRef::Url("https://x.org/a.txt")));
    }

    #[tokio::test]
    async fn reads_file_with_layout() {
        let f = write_tmp(".txt", b"\xEF\xBB\xBFline one\r\nline two\n\n");
        let r = TextProcessor::default()
            .process(&InputRef::Path(f.path()))
            .await
            .unwrap();
        assert_eq!(r.content(), "line one\nline two");
        assert_eq!(r.processor(), "TextProcessor");
        assert_eq!(r.metadata().get_str("content_type"), Some("text"));
    }

    #[tokio::test]
    async fn reflows_without_layout() {
        let f = write_tmp(".txt", b"wrapped\nline\n\nnext para");
        let opts = ProcessorOptions {
            preserve_layout: false,
            ..Default::default()
        };
        let r = TextProcessor::new(opts)
            .process(&InputRef::Path(f.path()))
            .await
            .unwrap();
        assert_eq!(r.content(), "wrapped line\n\nnext para");
    }

    #[tokio::test]
    async fn invalid_utf8_is_lossy() {
        let f = write_tmp(".txt", b"ok \xFF end");
        let r = TextProcessor::default()
            .process(&InputRef::Path(f.path()))
            .await
            .unwrap();
        assert_eq!(r.content(), "ok \u{FFFD} end");
    }
}
