//! PowerPoint `.pptx` decks, read straight from the OOXML zip container.
//!
//! Slides are ordered by their number (`slide2.xml` before `slide10.xml`).
//! Text comes from `<a:t>` runs grouped by `<a:p>` paragraph; `<a:tbl>`
//! graphic frames become [`Table`]s. Speaker notes are appended per slide.

use super::{has_extension, require_path, run_blocking, InputRef, Processor};
use crate::config::ProcessorOptions;
use crate::error::ExtractError;
use crate::markup::decode_entities;
use crate::result::{ConversionResult, Table};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const NAME: &str = "PresentationProcessor";
const FORMATS: &[&str] = &[".pptx"];

static RE_TABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<a:tbl>(.*?)</a:tbl>").unwrap());
static RE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<a:tr(?:\s[^>]*)?>(.*?)</a:tr>").unwrap());
static RE_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<a:tc(?:\s[^>]*)?>(.*?)</a:tc>").unwrap());
static RE_PARA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<a:p(?:\s[^>]*)?>(.*?)</a:p>").unwrap());
static RE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<a:t(?:\s[^>]*)?>(.*?)</a:t>").unwrap());

#[derive(Debug, Clone, Default)]
pub struct PresentationProcessor {
    options: ProcessorOptions,
}

impl PresentationProcessor {
    pub fn new(options: ProcessorOptions) -> Self {
        Self { options }
    }
}

/// One slide's extracted content.
#[derive(Debug, Default)]
struct Slide {
    paragraphs: Vec<String>,
    tables: Vec<Table>,
    notes: Vec<String>,
}

fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn paragraphs(xml: &str) -> Vec<String> {
    RE_PARA
        .captures_iter(xml)
        .map(|p| {
            RE_RUN
                .captures_iter(&p[1])
                .map(|t| decode_entities(&t[1]))
                .collect::<String>()
        })
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Split slide XML into free text and tables.
fn parse_slide(xml: &str) -> Slide {
    let tables = RE_TABLE
        .captures_iter(xml)
        .filter_map(|tbl| {
            let mut rows = RE_ROW.captures_iter(&tbl[1]).map(|row| {
                RE_CELL
                    .captures_iter(&row[1])
                    .map(|cell| paragraphs(&cell[1]).join(" "))
                    .collect::<Vec<_>>()
            });
            let header = rows.next()?;
            Some(Table::new(Some(header), rows.collect()))
        })
        .collect();

    let without_tables = RE_TABLE.replace_all(xml, "");
    Slide {
        paragraphs: paragraphs(&without_tables),
        tables,
        notes: Vec::new(),
    }
}

fn read_entry(archive: &mut zip::ZipArchive<std::fs::File>, name: &str) -> Option<String> {
    let mut entry = archive.by_name(name).ok()?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml).ok()?;
    Some(xml)
}

fn read_deck(path: &Path) -> Result<Vec<(u32, Slide)>, ExtractError> {
    let file = std::fs::File::open(path)
        .map_err(|e| ExtractError::conversion(NAME, format!("cannot open '{}': {e}", path.display())))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ExtractError::conversion(NAME, format!("not a pptx archive: {e}")))?;

    let mut numbers: Vec<u32> = archive.file_names().filter_map(slide_number).collect();
    numbers.sort_unstable();

    let mut slides = Vec::with_capacity(numbers.len());
    for n in numbers {
        let Some(xml) = read_entry(&mut archive, &format!("ppt/slides/slide{n}.xml")) else {
            continue;
        };
        let mut slide = parse_slide(&xml);
        if let Some(notes) = read_entry(&mut archive, &format!("ppt/notesSlides/notesSlide{n}.xml")) {
            // Notes pages repeat the slide number placeholder; keep prose only.
            slide.notes = paragraphs(&notes)
                .into_iter()
                .filter(|p| p.parse::<u32>().is_err())
                .collect();
        }
        slides.push((n, slide));
    }
    Ok(slides)
}

#[async_trait]
impl Processor for PresentationProcessor {
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
        let slides = run_blocking(NAME, move || read_deck(&path)).await?;
        debug!("PPTX {}: {} slides", source, slides.len());

        let slide_count = slides.len();
        let mut blocks = Vec::with_capacity(slide_count);
        let mut tables = Vec::new();
        for (position, (_, slide)) in slides.into_iter().enumerate() {
            let mut block = format!("## Slide {}", position + 1);
            if !slide.paragraphs.is_empty() {
                let sep = if self.options.preserve_layout { "\n" } else { " " };
                block.push_str("\n\n");
                block.push_str(&slide.paragraphs.join(sep));
            }
            for table in &slide.tables {
                block.push_str("\n\n");
                block.push_str(&table.to_markdown());
            }
            if !slide.notes.is_empty() {
                block.push_str("\n\n> Notes: ");
                block.push_str(&slide.notes.join(" "));
            }
            blocks.push(block);
            tables.extend(slide.tables);
        }

        Ok(ConversionResult::builder(NAME, blocks.join("\n\n"))
            .metadata("content_type", "presentation")
            .metadata("source", source)
            .metadata("slide_count", slide_count)
            .tables(tables)
            .build())
    }
}
