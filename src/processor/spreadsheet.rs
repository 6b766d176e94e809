//! Spreadsheets: Excel / OpenDocument workbooks via `calamine`, CSV via `csv`.
//!
//! Each non-empty sheet becomes one [`Table`] (first row as header) and a
//! Markdown pipe table under a `## Sheet: <name>` heading. A CSV file is a
//! single unnamed sheet.

use super::{has_extension, require_path, run_blocking, InputRef, Processor};
use crate::config::ProcessorOptions;
use crate::error::ExtractError;
use crate::result::{ConversionResult, Table};
use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const NAME: &str = "SpreadsheetProcessor";
const FORMATS: &[&str] = &[".xlsx", ".xls", ".xlsm", ".xlsb", ".ods", ".csv"];

#[derive(Debug, Clone, Default)]
pub struct SpreadsheetProcessor {
    options: ProcessorOptions,
}

impl SpreadsheetProcessor {
    pub fn new(options: ProcessorOptions) -> Self {
        Self { options }
    }
}

/// Cell value as it would be displayed: whole floats lose their `.0`.
fn format_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.replace('\r', "").replace('\n', " "),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#ERR:{e:?}"),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Drop blank rows and promote the first remaining row to header.
fn rows_to_table(rows: Vec<Vec<String>>) -> Option<Table> {
    let mut rows = rows
        .into_iter()
        .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
        .map(|r| r.into_iter().map(|c| c.trim().to_string()).collect::<Vec<_>>());
    let header = rows.next()?;
    Some(Table::new(Some(header), rows.collect()))
}

fn read_workbook(path: &Path) -> Result<Vec<(String, Table)>, ExtractError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ExtractError::conversion(NAME, format!("failed to open workbook: {e}")))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names().to_vec() {
        match workbook.worksheet_range(&name) {
            Ok(range) => {
                let rows = range
                    .rows()
                    .map(|row| row.iter().map(format_cell).collect())
                    .collect();
                if let Some(table) = rows_to_table(rows) {
                    sheets.push((name, table));
                }
            }
            Err(e) => warn!("Skipping unreadable sheet '{}': {}", name, e),
        }
    }
    Ok(sheets)
}

fn read_csv(path: &Path) -> Result<Vec<(String, Table)>, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ExtractError::conversion(NAME, format!("failed to open CSV: {e}")))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::conversion(NAME, format!("malformed CSV: {e}")))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows_to_table(rows)
        .map(|t| vec![(String::new(), t)])
        .unwrap_or_default())
}

#[async_trait]
impl Processor for SpreadsheetProcessor {
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
        let is_csv = input.extension().as_deref() == Some("csv");

        let source = path.display().to_string();
        let sheets = run_blocking(NAME, move || {
            if is_csv {
                read_csv(&path)
            } else {
                read_workbook(&path)
            }
        })
        .await?;
        debug!("Read {} non-empty sheet(s) from {}", sheets.len(), source);

        let blocks: Vec<String> = sheets
            .iter()
            .map(|(name, table)| {
                if name.is_empty() {
                    table.to_markdown()
                } else {
                    format!("## Sheet: {name}\n\n{}", table.to_markdown())
                }
            })
            .collect();

        let sheet_count = sheets.len();
        Ok(ConversionResult::builder(NAME, blocks.join("\n\n"))
            .metadata("content_type", "spreadsheet")
            .metadata("source", source)
            .metadata("sheet_count", sheet_count)
            .metadata("preserve_layout", self.options.preserve_layout)
            .tables(sheets.into_iter().map(|(_, t)| t))
            .build())
    }
}
