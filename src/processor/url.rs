//! Web pages fetched over HTTP(S).
//!
//! HTML responses go through the same HTML-to-Markdown conversion as local
//! `.html` files; `text/*` and JSON bodies are returned as-is. Anything else
//! (binary downloads) is rejected rather than guessed at.

use super::{InputRef, Processor};
use crate::config::ProcessorOptions;
use crate::error::ExtractError;
use crate::markup;
use crate::result::ConversionResult;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

const NAME: &str = "UrlProcessor";
const FORMATS: &[&str] = &["URLs"];

#[derive(Debug, Clone)]
pub struct UrlProcessor {
    options: ProcessorOptions,
    timeout: Duration,
}

impl Default for UrlProcessor {
    fn default() -> Self {
        Self::new(ProcessorOptions::default(), 120)
    }
}

impl UrlProcessor {
    pub fn new(options: ProcessorOptions, download_timeout_secs: u64) -> Self {
        Self {
            options,
            timeout: Duration::from_secs(download_timeout_secs.max(1)),
        }
    }
}

/// How a response body is interpreted, decided from its `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Html,
    Text,
}

fn body_kind(content_type: &str) -> Option<BodyKind> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        // Servers that omit the header almost always serve HTML.
        "" | "text/html" | "application/xhtml+xml" => Some(BodyKind::Html),
        "application/json" | "application/xml" => Some(BodyKind::Text),
        m if m.starts_with("text/") => Some(BodyKind::Text),
        _ => None,
    }
}

pub(crate) fn is_url(input: &str) -> bool {
    let lower = input.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[async_trait]
impl Processor for UrlProcessor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supported_formats(&self) -> &'static [&'static str] {
        FORMATS
    }

    fn can_process(&self, input: &InputRef<'_>) -> bool {
        matches!(input, InputRef::Url(u) if is_url(u))
    }

    async fn process(&self, input: &InputRef<'_>) -> Result<ConversionResult, ExtractError> {
        let url = match input {
            InputRef::Url(u) => u.trim(),
            InputRef::Path(p) => {
                return Err(ExtractError::conversion(
                    NAME,
                    format!("expected a URL, got '{}'", p.display()),
                ))
            }
        };
        info!("Fetching {}", url);

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ExtractError::conversion(NAME, e))?;

        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractError::conversion(
                    NAME,
                    format!("download of '{url}' timed out after {}s", self.timeout.as_secs()),
                )
            } else {
                ExtractError::conversion(NAME, format!("download of '{url}' failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(ExtractError::conversion(NAME, format!("HTTP {}", response.status())));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let kind = body_kind(&content_type).ok_or_else(|| {
            ExtractError::conversion(NAME, format!("unsupported content type '{content_type}'"))
        })?;

        let body = response
            .text()
            .await
            .map_err(|e| ExtractError::conversion(NAME, format!("cannot read body of '{url}': {e}")))?;
        debug!("Fetched {} bytes ({})", body.len(), content_type);

        let mut builder = match kind {
            BodyKind::Html => {
                let (content, tables) = markup::html_to_markdown(&body, self.options.include_images);
                let mut b = ConversionResult::builder(NAME, content).tables(tables);
                if let Some(title) = markup::html_title(&body) {
                    b = b.metadata("title", title);
                }
                b
            }
            BodyKind::Text => {
                let text = body.replace("\r\n", "\n");
                let tables = markup::extract_tables(&text);
                ConversionResult::builder(NAME, text.trim().to_string()).tables(tables)
            }
        };
        builder = builder
            .metadata("content_type", "url")
            .metadata("url", url)
            .metadata("mime_type", content_type);
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response on a local port.
    async fn serve_once(status: &'static str, content_type: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/page")
    }

    #[test]
    fn claims_only_http_urls() {
        let p = UrlProcessor::default();
        assert!(p.can_process(&InputRef::Url("https://example.com")));
        assert!(p.can_process(&InputRef::Url("HTTP://example.com/a.pdf")));
        assert!(!p.can_process(&InputRef::Url("ftp://example.com")));
        assert!(!p.can_process(&InputRef::Path(std::path::Path::new("http.txt"))));
        assert_eq!(p.supported_formats(), &["URLs"]);
    }

    #[test]
    fn content_type_decides_body_kind() {
        assert_eq!(body_kind("text/html; charset=utf-8"), Some(BodyKind::Html));
        assert_eq!(body_kind(""), Some(BodyKind::Html));
        assert_eq!(body_kind("text/plain"), Some(BodyKind::Text));
        assert_eq!(body_kind("application/json"), Some(BodyKind::Text));
        assert_eq!(body_kind("application/pdf"), None);
    }

    #[tokio::test]
    async fn html_page_becomes_markdown() {
        let url = serve_once(
            "200 OK",
            "text/html",
            "<html><head><title>Hello</title></head><body><h1>Welcome</h1><p>Body text</p></body></html>",
        )
        .await;

        let r = UrlProcessor::default().process(&InputRef::Url(&url)).await.unwrap();
        assert_eq!(r.processor(), NAME);
        assert!(r.content().contains("# Welcome"));
        assert!(r.content().contains("Body text"));
        assert_eq!(r.metadata().get_str("title"), Some("Hello"));
        assert_eq!(r.metadata().get_str("url"), Some(url.as_str()));
    }

    #[tokio::test]
    async fn http_error_is_a_conversion_error() {
        let url = serve_once("404 Not Found", "text/plain", "missing").await;
        let err = UrlProcessor::default().process(&InputRef::Url(&url)).await.unwrap_err();
        match err {
            ExtractError::Conversion { processor, detail } => {
                assert_eq!(processor, NAME);
                assert!(detail.contains("404"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
