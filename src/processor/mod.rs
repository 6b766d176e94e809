//! Format processors.
//!
//! A [`Processor`] claims inputs by extension or scheme
//! ([`Processor::can_process`]) and turns a claimed input into a
//! [`ConversionResult`] ([`Processor::process`]). The router in
//! [`crate::extractor`] asks processors in registration order and hands the
//! input to the first one that claims it.
//!
//! Processors hold only their [`ProcessorOptions`] and immutable
//! collaborators, so one instance serves any number of concurrent calls.
//! Parsers that block (office formats, pdfium, image decoding) run inside
//! [`tokio::task::spawn_blocking`].

pub mod accelerated;
pub mod docx;
pub mod html;
pub mod image;
pub mod pdf;
pub mod presentation;
pub mod raw_text;
pub mod spreadsheet;
pub mod text;
pub mod url;

pub use accelerated::AcceleratedProcessor;
pub use docx::DocxProcessor;
pub use html::HtmlProcessor;
pub use image::ImageProcessor;
pub use pdf::PdfProcessor;
pub use presentation::PresentationProcessor;
pub use raw_text::RawTextProcessor;
pub use spreadsheet::SpreadsheetProcessor;
pub use text::TextProcessor;
pub use url::UrlProcessor;

use crate::error::ExtractError;
use crate::result::ConversionResult;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;

/// What a processor is asked to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRef<'a> {
    Path(&'a Path),
    Url(&'a str),
}

impl<'a> InputRef<'a> {
    /// Lower-cased extension without the dot. For URLs the extension of the
    /// path component, ignoring query and fragment.
    pub fn extension(&self) -> Option<String> {
        match self {
            InputRef::Path(p) => p
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase()),
            InputRef::Url(u) => {
                let rest = u.split_once("://").map_or(*u, |(_, r)| r);
                let rest = rest.split(['?', '#']).next().unwrap_or(rest);
                let (_, path) = rest.split_once('/')?;
                let last = path.rsplit('/').next().unwrap_or(path);
                last.rsplit_once('.')
                    .map(|(_, ext)| ext.to_ascii_lowercase())
                    .filter(|ext| !ext.is_empty())
            }
        }
    }

    pub fn as_path(&self) -> Option<&'a Path> {
        match self {
            InputRef::Path(p) => Some(p),
            InputRef::Url(_) => None,
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, InputRef::Url(_))
    }
}

impl fmt::Display for InputRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputRef::Path(p) => write!(f, "{}", p.display()),
            InputRef::Url(u) => f.write_str(u),
        }
    }
}

/// A capability unit that converts one family of inputs.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Stable name, written to `metadata.processor`.
    fn name(&self) -> &'static str;

    /// Format tokens this processor handles: dotted extensions, or `"URLs"`.
    fn supported_formats(&self) -> &'static [&'static str];

    /// Cheap claim test. Never touches the filesystem or network.
    fn can_process(&self, input: &InputRef<'_>) -> bool;

    /// Convert a claimed input.
    async fn process(&self, input: &InputRef<'_>) -> Result<ConversionResult, ExtractError>;
}

/// Extension test shared by the file processors.
pub(crate) fn has_extension(input: &InputRef<'_>, formats: &[&str]) -> bool {
    match (input, input.extension()) {
        (InputRef::Path(_), Some(ext)) => formats
            .iter()
            .any(|f| f.trim_start_matches('.') == ext),
        _ => false,
    }
}

/// The path of a file input, or a conversion error naming `processor`.
pub(crate) fn require_path<'a>(
    processor: &str,
    input: &InputRef<'a>,
) -> Result<&'a Path, ExtractError> {
    input
        .as_path()
        .ok_or_else(|| ExtractError::conversion(processor, format!("expected a file, got '{input}'")))
}

/// Run blocking parser work off the async runtime.
pub(crate) async fn run_blocking<T, F>(processor: &'static str, work: F) -> Result<T, ExtractError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ExtractError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ExtractError::conversion(processor, format!("worker task failed: {e}")))?
}

/// Reflow hard-wrapped lines into paragraphs when layout is not preserved.
pub(crate) fn reflow(text: &str) -> String {
    text.split("\n\n")
        .map(|para| {
            para.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_extension_is_lowercased() {
        let p = Path::new("/tmp/Report.PDF");
        assert_eq!(InputRef::Path(p).extension().as_deref(), Some("pdf"));
        assert_eq!(InputRef::Path(Path::new("README")).extension(), None);
    }

    #[test]
    fn url_extension_ignores_query() {
        let u = InputRef::Url("https://x.org/files/data.CSV?dl=1#top");
        assert_eq!(u.extension().as_deref(), Some("csv"));
        assert_eq!(InputRef::Url("https://x.org/").extension(), None);
        assert_eq!(InputRef::Url("https://x.org").extension(), None);
    }

    #[test]
    fn has_extension_only_matches_paths() {
        let formats = [".txt", ".text"];
        assert!(has_extension(&InputRef::Path(Path::new("a.TXT")), &formats));
        assert!(!has_extension(&InputRef::Path(Path::new("a.md")), &formats));
        assert!(!has_extension(&InputRef::Url("http://x/a.txt"), &formats));
    }

    #[test]
    fn reflow_joins_wrapped_lines() {
        assert_eq!(reflow("one\ntwo\n\n\nthree  \n four"), "one two\n\nthree four");
    }
}
