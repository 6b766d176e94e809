//! Output renderers for [`crate::ConversionResult`].
//!
//! Each submodule is a pure function of the result's content and tables.
//! [`render`] dispatches on [`OutputFormat`] and is what the batch report
//! and the CLI call.

pub mod csv;
pub mod html;
pub mod json;
pub mod text;

use crate::config::OutputFormat;
use crate::error::ExtractError;
use crate::result::ConversionResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Optional guidance for JSON rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonRequest {
    /// Field names to extract.
    pub fields: Option<Vec<String>>,
    /// JSON schema the output must follow.
    pub schema: Option<Value>,
}

impl JsonRequest {
    pub fn new(fields: Option<Vec<String>>, schema: Option<Value>) -> Self {
        Self { fields, schema }
    }

    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }
}

/// Render one result to a string in `format`.
///
/// CSV exports every table with `=== Table N ===` delimiters; JSON is
/// pretty-printed.
pub fn render(
    result: &ConversionResult,
    format: OutputFormat,
    request: &JsonRequest,
) -> Result<String, ExtractError> {
    match format {
        OutputFormat::Markdown => Ok(result.render_markdown()),
        OutputFormat::Html => Ok(result.render_html()),
        OutputFormat::Text => Ok(result.render_text()),
        OutputFormat::Csv => result.render_csv(true),
        OutputFormat::Json => {
            let value = result.render_json(request.fields(), request.schema())?;
            to_pretty_json(&value)
        }
    }
}

pub(crate) fn to_pretty_json(value: &Value) -> Result<String, ExtractError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ExtractError::Internal(format!("JSON serialisation failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Table;

    #[test]
    fn dispatches_on_format() {
        let r = ConversionResult::builder("TextConverter", "# Hi")
            .table(Table::new(None, vec![vec!["a".into()]]))
            .build();
        let req = JsonRequest::default();
        assert_eq!(render(&r, OutputFormat::Markdown, &req).unwrap(), "# Hi");
        assert!(render(&r, OutputFormat::Html, &req).unwrap().contains("<h1>Hi</h1>"));
        assert_eq!(render(&r, OutputFormat::Text, &req).unwrap(), "Hi");
        assert!(render(&r, OutputFormat::Csv, &req).unwrap().starts_with("=== Table 1 ==="));
        let json = render(&r, OutputFormat::Json, &req).unwrap();
        assert!(json.contains("\"structured_json\""));
    }

    #[test]
    fn csv_without_tables_fails() {
        let r = ConversionResult::new("TextConverter", "no tables");
        let err = render(&r, OutputFormat::Csv, &JsonRequest::default()).unwrap_err();
        assert!(matches!(err, ExtractError::NoTablesFound));
    }
}
