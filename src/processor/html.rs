//! Local HTML files, converted to Markdown.

use super::text::read_text;
use super::{has_extension, require_path, InputRef, Processor};
use crate::config::ProcessorOptions;
use crate::error::ExtractError;
use crate::markup;
use crate::result::ConversionResult;
use async_trait::async_trait;

const NAME: &str = "HtmlProcessor";
const FORMATS: &[&str] = &[".html", ".htm"];

#[derive(Debug, Clone, Default)]
pub struct HtmlProcessor {
    options: ProcessorOptions,
}

impl HtmlProcessor {
    pub fn new(options: ProcessorOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Processor for HtmlProcessor {
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
        let html = read_text(NAME, path).await?;
        let (content, tables) = markup::html_to_markdown(&html, self.options.include_images);

        let mut builder = ConversionResult::builder(NAME, content)
            .metadata("content_type", "html")
            .metadata("source", path.display().to_string());
        if let Some(title) = markup::html_title(&html) {
            builder = builder.metadata("title", title);
        }
        Ok(builder.tables(tables).build())
    }
}
