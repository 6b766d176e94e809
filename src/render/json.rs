//! Structured JSON rendering.
//!
//! Three shapes, chosen by what the caller asks for:
//!
//! | request          | `format`                 | payload key         |
//! |------------------|--------------------------|---------------------|
//! | nothing          | `structured_json`        | `document` + `tables` |
//! | field names      | `specified_fields`       | `extracted_fields`  |
//! | JSON schema      | `structured_json_schema` | `structured_data`   |
//!
//! When both fields and a schema are given the schema decides the shape.
//! If the extractor supports field filtering the schema-shaped object is
//! narrowed to the requested fields; otherwise the fields are ignored.

use crate::error::ExtractError;
use crate::fields::FieldExtractor;
use crate::result::ConversionResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::warn;

static RE_ATX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*#*\s*$").unwrap());

/// Split Markdown into heading-delimited sections.
///
/// Text before the first heading becomes a section with a `null` heading
/// and level 0. Headings inside fenced code are ignored.
pub fn sections(content: &str) -> Vec<Value> {
    let mut out = Vec::new();
    let mut heading: Option<String> = None;
    let mut level = 0usize;
    let mut body: Vec<&str> = Vec::new();
    let mut in_fence = false;

    let flush = |heading: &Option<String>, level: usize, body: &mut Vec<&str>, out: &mut Vec<Value>| {
        let text = body.join("\n").trim().to_string();
        if heading.is_some() || !text.is_empty() {
            out.push(json!({ "heading": heading, "level": level, "content": text }));
        }
        body.clear();
    };

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if !in_fence {
            if let Some(caps) = RE_ATX.captures(line.trim()) {
                flush(&heading, level, &mut body, &mut out);
                heading = Some(caps[2].to_string());
                level = caps[1].len();
                continue;
            }
        }
        body.push(line);
    }
    flush(&heading, level, &mut body, &mut out);
    out
}

fn metadata_value(result: &ConversionResult) -> Value {
    Value::Object(result.metadata().as_map().clone())
}

/// Render `result` as JSON, delegating field and schema extraction to
/// `extractor`.
pub fn render(
    result: &ConversionResult,
    extractor: &dyn FieldExtractor,
    fields: Option<&[String]>,
    schema: Option<&Value>,
) -> Result<Value, ExtractError> {
    let fields = fields.filter(|f| !f.is_empty());

    match (fields, schema) {
        (_, Some(schema)) => {
            let mut data = extractor.extract_schema(result.content(), schema)?;
            if let Some(fields) = fields {
                data = narrow_to_fields(extractor, data, fields);
            }
            Ok(json!({
                "structured_data": data,
                "format": "structured_json_schema",
                "metadata": metadata_value(result),
            }))
        }
        (Some(fields), None) => {
            let extracted = extractor.extract_fields(result.content(), fields)?;
            Ok(json!({
                "extracted_fields": Value::Object(extracted),
                "format": "specified_fields",
                "metadata": metadata_value(result),
            }))
        }
        (None, None) => {
            let tables = serde_json::to_value(result.tables())
                .map_err(|e| ExtractError::Internal(format!("table serialisation failed: {e}")))?;
            Ok(json!({
                "document": {
                    "content": result.content(),
                    "sections": sections(result.content()),
                },
                "tables": tables,
                "metadata": metadata_value(result),
                "format": "structured_json",
            }))
        }
    }
}

fn narrow_to_fields(extractor: &dyn FieldExtractor, data: Value, fields: &[String]) -> Value {
    if !extractor.supports_field_filtering() {
        warn!(
            "Both fields and a JSON schema were given; the schema decides the output and {} field(s) are ignored",
            fields.len()
        );
        return data;
    }

    let Value::Object(map) = data else {
        return data;
    };

    let dropped: Vec<&str> = fields
        .iter()
        .filter(|f| !map.contains_key(f.as_str()))
        .map(String::as_str)
        .collect();
    if !dropped.is_empty() {
        warn!("Requested fields not declared by the schema were dropped: {}", dropped.join(", "));
    }

    let narrowed: Map<String, Value> = map
        .into_iter()
        .filter(|(k, _)| fields.iter().any(|f| f == k))
        .collect();
    Value::Object(narrowed)
}
