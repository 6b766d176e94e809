//! The normalized, format-agnostic extraction result.
//!
//! Every processor produces a [`ConversionResult`]; every output format is
//! rendered from one. Decoupling the two means a new input format never
//! touches the renderers and a new output format never touches the
//! processors.
//!
//! A result is assembled once through [`ConversionResultBuilder`] and is
//! read-only afterwards: the renderers borrow it, never mutate it, and
//! return identical output however often they are called.

use crate::error::ExtractError;
use crate::fields::{FieldExtractor, HeuristicFieldExtractor};
use crate::render;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Metadata key naming the processor that produced a result.
pub const PROCESSOR_KEY: &str = "processor";

/// A 2-D grid of string cells with an optional header row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Option<Vec<String>>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Number of columns of the widest row (header included).
    pub fn width(&self) -> usize {
        self.headers
            .iter()
            .chain(self.rows.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_none() && self.rows.is_empty()
    }

    /// Render as a GFM pipe table. Without a header the first row is promoted.
    pub fn to_markdown(&self) -> String {
        let width = self.width().max(1);
        let pad = |row: &[String]| -> String {
            let cells: Vec<String> = (0..width)
                .map(|i| {
                    row.get(i)
                        .map(|c| c.replace('|', "\\|").replace('\n', " "))
                        .unwrap_or_default()
                })
                .collect();
            format!("| {} |", cells.join(" | "))
        };

        let (header, body): (&[String], &[Vec<String>]) = match (&self.headers, self.rows.split_first()) {
            (Some(h), _) => (h.as_slice(), self.rows.as_slice()),
            (None, Some((first, rest))) => (first.as_slice(), rest),
            (None, None) => return String::new(),
        };

        let mut lines = Vec::with_capacity(body.len() + 2);
        lines.push(pad(header));
        lines.push(format!("|{}", " --- |".repeat(width)));
        lines.extend(body.iter().map(|r| pad(r.as_slice())));
        lines.join("\n")
    }
}

/// Insertion-ordered metadata of scalar values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Convenience accessor for string values.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// The output of any processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    content: String,
    metadata: Metadata,
    tables: Vec<Table>,
}

impl ConversionResult {
    /// Start building a result produced by `processor`.
    pub fn builder(processor: impl Into<String>, content: impl Into<String>) -> ConversionResultBuilder {
        let mut metadata = Map::new();
        metadata.insert(PROCESSOR_KEY.to_string(), Value::String(processor.into()));
        ConversionResultBuilder {
            content: content.into(),
            metadata,
            tables: Vec::new(),
        }
    }

    /// A result with content only.
    pub fn new(processor: impl Into<String>, content: impl Into<String>) -> Self {
        Self::builder(processor, content).build()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Name of the processor that produced this result.
    pub fn processor(&self) -> &str {
        self.metadata.get_str(PROCESSOR_KEY).unwrap_or_default()
    }

    // ── Renderers ────────────────────────────────────────────────────────

    /// Markdown is the processors' native output; returned as-is.
    pub fn render_markdown(&self) -> String {
        self.content.clone()
    }

    pub fn render_html(&self) -> String {
        render::html::render(&self.content)
    }

    pub fn render_text(&self) -> String {
        render::text::render(&self.content)
    }

    /// Export tables as CSV. Fails with [`ExtractError::NoTablesFound`] when
    /// there are none.
    pub fn render_csv(&self, include_all_tables: bool) -> Result<String, ExtractError> {
        render::csv::render(&self.tables, include_all_tables)
    }

    /// Structured JSON, optionally guided by field names or a JSON schema,
    /// using the default [`HeuristicFieldExtractor`].
    pub fn render_json(
        &self,
        fields: Option<&[String]>,
        schema: Option<&Value>,
    ) -> Result<Value, ExtractError> {
        self.render_json_with(&HeuristicFieldExtractor, fields, schema)
    }

    /// Like [`Self::render_json`] with a caller-supplied field extractor.
    pub fn render_json_with(
        &self,
        extractor: &dyn FieldExtractor,
        fields: Option<&[String]>,
        schema: Option<&Value>,
    ) -> Result<Value, ExtractError> {
        render::json::render(self, extractor, fields, schema)
    }
}

/// Consuming builder for [`ConversionResult`].
#[derive(Debug)]
pub struct ConversionResultBuilder {
    content: String,
    metadata: Map<String, Value>,
    tables: Vec<Table>,
}

impl ConversionResultBuilder {
    /// Add a metadata entry. The processor key is fixed at construction and
    /// cannot be overwritten.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key == PROCESSOR_KEY {
            debug!("Ignoring attempt to overwrite metadata.processor");
            return self;
        }
        self.metadata.insert(key, value.into());
        self
    }

    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn tables(mut self, tables: impl IntoIterator<Item = Table>) -> Self {
        self.tables.extend(tables);
        self
    }

    pub fn build(self) -> ConversionResult {
        ConversionResult {
            content: self.content,
            metadata: Metadata(self.metadata),
            tables: self.tables,
        }
    }
}
