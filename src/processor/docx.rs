//! Word documents via `docx-rs`.
//!
//! Body paragraphs become Markdown paragraphs (heading styles map to ATX
//! headings), body tables become [`Table`]s rendered in place as pipe
//! tables.

use super::{has_extension, require_path, run_blocking, InputRef, Processor};
use crate::config::ProcessorOptions;
use crate::error::ExtractError;
use crate::result::{ConversionResult, Table};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

const NAME: &str = "DocxProcessor";
const FORMATS: &[&str] = &[".docx"];

#[derive(Debug, Clone, Default)]
pub struct DocxProcessor {
    options: ProcessorOptions,
}

impl DocxProcessor {
    pub fn new(options: ProcessorOptions) -> Self {
        Self { options }
    }
}

/// Heading level for a paragraph style id such as `Heading2` or `Title`.
fn heading_level(style: &str) -> Option<usize> {
    let lower = style.to_ascii_lowercase();
    if lower == "title" {
        return Some(1);
    }
    let digits = lower
        .strip_prefix("heading")?
        .trim_start_matches([' ', '_']);
    digits.parse::<usize>().ok().filter(|l| (1..=6).contains(l))
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &para.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                    docx_rs::RunChild::Tab(_) => text.push('\t'),
                    docx_rs::RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}

fn paragraph_markdown(para: &docx_rs::Paragraph) -> String {
    let text = paragraph_text(para);
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    let level = para
        .property
        .style
        .as_ref()
        .and_then(|s| heading_level(&s.val));
    match level {
        Some(level) => format!("{} {}", "#".repeat(level), text.replace('\n', " ")),
        None => text.to_string(),
    }
}

fn table_rows(table: &docx_rs::Table) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(tr) = row;
        let mut cells = Vec::new();
        for cell in &tr.cells {
            let docx_rs::TableRowChild::TableCell(tc) = cell;
            let parts: Vec<String> = tc
                .children
                .iter()
                .filter_map(|child| match child {
                    docx_rs::TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                    _ => None,
                })
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            cells.push(parts.join(" "));
        }
        if cells.iter().any(|c| !c.is_empty()) {
            rows.push(cells);
        }
    }
    rows
}

fn read_document(path: &Path) -> Result<(Vec<String>, Vec<Table>), ExtractError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ExtractError::conversion(NAME, format!("cannot read '{}': {e}", path.display())))?;
    let docx = docx_rs::read_docx(&bytes)
        .map_err(|e| ExtractError::conversion(NAME, format!("failed to parse docx: {e:?}")))?;

    let mut blocks = Vec::new();
    let mut tables = Vec::new();
    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => {
                let md = paragraph_markdown(para);
                if !md.is_empty() {
                    blocks.push(md);
                }
            }
            docx_rs::DocumentChild::Table(table) => {
                let mut rows = table_rows(table).into_iter();
                if let Some(header) = rows.next() {
                    let table = Table::new(Some(header), rows.collect());
                    blocks.push(table.to_markdown());
                    tables.push(table);
                }
            }
            _ => {}
        }
    }
    Ok((blocks, tables))
}

#[async_trait]
impl Processor for DocxProcessor {
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
        let path: PathBuf = require_path(NAME, input)?.to_path_buf();
        let source = path.display().to_string();
        let (blocks, tables) = run_blocking(NAME, move || read_document(&path)).await?;
        debug!("DOCX {}: {} blocks, {} tables", source, blocks.len(), tables.len());

        let content = if self.options.preserve_layout {
            blocks.join("\n\n")
        } else {
            super::reflow(&blocks.join("\n\n"))
        };

        Ok(ConversionResult::builder(NAME, content)
            .metadata("content_type", "document")
            .metadata("source", source)
            .metadata("table_count", tables.len())
            .tables(tables)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run, TableCell, TableRow};

    fn cell(text: &str) -> TableCell {
        TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
    }

    #[test]
    fn heading_styles() {
        assert_eq!(heading_level("Heading1"), Some(1));
        assert_eq!(heading_level("heading 3"), Some(3));
        assert_eq!(heading_level("Title"), Some(1));
        assert_eq!(heading_level("Heading9"), None);
        assert_eq!(heading_level("Normal"), None);
    }

    #[tokio::test]
    async fn reads_paragraphs_and_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.docx");
        let file = std::fs::File::create(&path).unwrap();
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Quarterly memo")))
            .add_table(docx_rs::Table::new(vec![
                TableRow::new(vec![cell("Item"), cell("Cost")]),
                TableRow::new(vec![cell("Paper"), cell("12")]),
            ]))
            .build()
            .pack(file)
            .unwrap();

        let r = DocxProcessor::default()
            .process(&InputRef::Path(&path))
            .await
            .unwrap();
        assert!(r.content().starts_with("Quarterly memo"), "got: {}", r.content());
        assert_eq!(r.tables().len(), 1);
        assert_eq!(r.tables()[0].headers, Some(vec!["Item".to_string(), "Cost".to_string()]));
        assert_eq!(r.tables()[0].rows, vec![vec!["Paper".to_string(), "12".to_string()]]);
        assert!(r.content().contains("| Item | Cost |"));
    }

    #[tokio::test]
    async fn garbage_is_a_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.docx");
        std::fs::write(&path, b"nope").unwrap();
        let err = DocxProcessor::default()
            .process(&InputRef::Path(&path))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Conversion { .. }));
    }
}
