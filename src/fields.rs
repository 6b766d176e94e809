//! Field- and schema-guided extraction from converted content.
//!
//! The JSON renderer delegates to a [`FieldExtractor`] when the caller asks
//! for specific fields or a JSON schema. The default
//! [`HeuristicFieldExtractor`] is deterministic and model-free: it reads
//! `Key: value` lines and two-column table rows and coerces the values to
//! the types the schema declares.

use crate::error::ExtractError;
use crate::markup;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

/// Turns free-form content into named values.
pub trait FieldExtractor: Send + Sync {
    /// One entry per requested field, in request order. Fields that cannot
    /// be found map to `null`.
    fn extract_fields(
        &self,
        content: &str,
        fields: &[String],
    ) -> Result<Map<String, Value>, ExtractError>;

    /// A value shaped like `schema`: every declared property is present,
    /// missing values are `null`, arrays default to `[]` and nested
    /// objects are filled recursively.
    fn extract_schema(&self, content: &str, schema: &Value) -> Result<Value, ExtractError>;

    /// Whether a schema-shaped result may be narrowed to a field list.
    fn supports_field_filtering(&self) -> bool {
        false
    }
}

/// Key/value heuristics over Markdown and HTML content.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicFieldExtractor;

static RE_KEY_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s+)?(?:\*\*|__)?([^:|*]{1,80}?)(?:\*\*|__)?\s*:\s*(?:\*\*|__)?\s*(.+?)\s*$")
        .unwrap()
});

static RE_NON_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_\-]+").unwrap());

/// Lower-case, punctuation-insensitive form used to match keys to fields.
pub fn normalize_key(key: &str) -> String {
    let stripped: String = key
        .chars()
        .filter(|c| !matches!(c, '*' | '`' | '#' | '"' | '\''))
        .collect();
    RE_NON_KEY
        .replace_all(stripped.trim(), " ")
        .trim()
        .to_lowercase()
}

impl HeuristicFieldExtractor {
    /// Every `key → value` pair found in `content`. The first occurrence of
    /// a key wins.
    fn collect_pairs(content: &str) -> HashMap<String, String> {
        let mut pairs = HashMap::new();

        for line in content.lines() {
            if markup::is_table_row(line) {
                continue;
            }
            if let Some(caps) = RE_KEY_VALUE.captures(line) {
                let key = normalize_key(&caps[1]);
                let value = caps[2].trim().to_string();
                if !key.is_empty() && !value.is_empty() {
                    pairs.entry(key).or_insert(value);
                }
            }
        }

        for table in markup::extract_tables(content) {
            let rows = table.headers.iter().chain(table.rows.iter());
            for row in rows {
                if let [key, value, ..] = row.as_slice() {
                    let key = normalize_key(key);
                    if !key.is_empty() && !value.trim().is_empty() {
                        pairs.entry(key).or_insert_with(|| value.trim().to_string());
                    }
                }
            }
        }

        pairs
    }

    fn fill_object(
        pairs: &HashMap<String, String>,
        schema: &Value,
        path: &str,
    ) -> Result<Value, ExtractError> {
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| ExtractError::FieldExtraction {
                detail: format!("schema object '{path}' does not declare 'properties'"),
            })?;

        let mut out = Map::new();
        for (name, prop) in properties {
            let value = match schema_type(prop) {
                Some("object") => Self::fill_object(pairs, prop, &format!("{path}.{name}"))?,
                Some("array") => pairs
                    .get(&normalize_key(name))
                    .map(|raw| split_list(raw, prop.get("items")))
                    .unwrap_or_else(|| Value::Array(Vec::new())),
                ty => pairs
                    .get(&normalize_key(name))
                    .map(|raw| coerce(raw, ty))
                    .unwrap_or(Value::Null),
            };
            out.insert(name.clone(), value);
        }
        Ok(Value::Object(out))
    }
}

impl FieldExtractor for HeuristicFieldExtractor {
    fn extract_fields(
        &self,
        content: &str,
        fields: &[String],
    ) -> Result<Map<String, Value>, ExtractError> {
        let pairs = Self::collect_pairs(content);
        Ok(fields
            .iter()
            .map(|field| {
                let value = pairs
                    .get(&normalize_key(field))
                    .map(|v| Value::String(v.clone()))
                    .unwrap_or(Value::Null);
                (field.clone(), value)
            })
            .collect())
    }

    fn extract_schema(&self, content: &str, schema: &Value) -> Result<Value, ExtractError> {
        if !schema.is_object() {
            return Err(ExtractError::FieldExtraction {
                detail: "JSON schema must be an object".into(),
            });
        }
        let pairs = Self::collect_pairs(content);
        Self::fill_object(&pairs, schema, "$")
    }
}

fn schema_type(prop: &Value) -> Option<&str> {
    match prop.get("type") {
        Some(Value::String(s)) => Some(s.as_str()),
        // ["string", "null"] style unions: first non-null type.
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ if prop.get("properties").is_some() => Some("object"),
        _ => None,
    }
}

/// Convert a raw string to the JSON type a schema property declares.
/// Values that do not parse as the declared type become `null`.
fn coerce(raw: &str, ty: Option<&str>) -> Value {
    let raw = raw.trim();
    match ty {
        Some("number") => parse_number(raw)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some("integer") => parse_integer(raw).map(Value::from).unwrap_or(Value::Null),
        Some("boolean") => match raw.to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "☑" | "x" => Value::Bool(true),
            "false" | "no" | "n" | "0" | "☐" => Value::Bool(false),
            _ => Value::Null,
        },
        _ => Value::String(raw.to_string()),
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '€' | '£' | '%' | ' '))
        .collect();
    cleaned.parse::<f64>().ok()
}

/// Whole numbers that fit in an `i64`. Digit strings are parsed exactly;
/// other notations go through `f64` and must land inside the `i64` range.
fn parse_integer(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '€' | '£' | '%' | ' '))
        .collect();
    if let Ok(n) = cleaned.parse::<i64>() {
        return Some(n);
    }
    let f = cleaned.parse::<f64>().ok()?;
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn split_list(raw: &str, items: Option<&Value>) -> Value {
    let item_type = items.and_then(schema_type);
    Value::Array(
        raw.split([',', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| coerce(s, item_type))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const INVOICE: &str = "# Invoice\n\n**Invoice Number:** INV-042\nDate: 2024-03-01\n- Paid: yes\n\n| Field | Value |\n| --- | --- |\n| Total Amount | $1,250.50 |\n| Items | 3 |\n";

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_key_ignores_case_and_separators() {
        assert_eq!(normalize_key("Invoice_Number"), "invoice number");
        assert_eq!(normalize_key("**Total  Amount**"), "total amount");
        assert_eq!(normalize_key("due-date"), "due date");
    }

    #[test]
    fn extracts_requested_fields_in_order() {
        let out = HeuristicFieldExtractor
            .extract_fields(INVOICE, &fields(&["date", "invoice_number", "missing"]))
            .unwrap();
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["date", "invoice_number", "missing"]);
        assert_eq!(out["invoice_number"], json!("INV-042"));
        assert_eq!(out["date"], json!("2024-03-01"));
        assert_eq!(out["missing"], Value::Null);
    }

    #[test]
    fn table_rows_provide_values() {
        let out = HeuristicFieldExtractor
            .extract_fields(INVOICE, &fields(&["total_amount"]))
            .unwrap();
        assert_eq!(out["total_amount"], json!("$1,250.50"));
    }

    #[test]
    fn schema_fills_every_property_with_types() {
        let schema = json!({
            "type": "object",
            "properties": {
                "invoice_number": {"type": "string"},
                "total_amount": {"type": "number"},
                "items": {"type": "integer"},
                "paid": {"type": "boolean"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "vendor": {
                    "type": "object",
                    "properties": {"name": {"type": "string"}}
                },
                "notes": {"type": "string"}
            }
        });
        let out = HeuristicFieldExtractor.extract_schema(INVOICE, &schema).unwrap();
        assert_eq!(out["invoice_number"], json!("INV-042"));
        assert_eq!(out["total_amount"], json!(1250.5));
        assert_eq!(out["items"], json!(3));
        assert_eq!(out["paid"], json!(true));
        assert_eq!(out["tags"], json!([]));
        assert_eq!(out["vendor"], json!({"name": null}));
        assert_eq!(out["notes"], Value::Null);
    }

    #[test]
    fn schema_without_properties_is_an_error() {
        let err = HeuristicFieldExtractor
            .extract_schema("x", &json!({"type": "object"}))
            .unwrap_err();
        assert!(matches!(err, ExtractError::FieldExtraction { .. }));

        let err = HeuristicFieldExtractor
            .extract_schema("x", &json!("not a schema"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::FieldExtraction { .. }));
    }

    #[test]
    fn list_values_are_split() {
        let schema = json!({
            "properties": {"tags": {"type": "array", "items": {"type": "string"}}}
        });
        let out = HeuristicFieldExtractor
            .extract_schema("Tags: red, green; blue", &schema)
            .unwrap();
        assert_eq!(out["tags"], json!(["red", "green", "blue"]));
    }

    #[test]
    fn unparseable_numbers_become_null() {
        assert_eq!(coerce("n/a", Some("number")), Value::Null);
        assert_eq!(coerce("2.5", Some("integer")), Value::Null);
        assert_eq!(coerce("12%", Some("number")), json!(12.0));
    }

    #[test]
    fn out_of_range_integers_become_null() {
        let schema = json!({
            "properties": {
                "count": {"type": "integer"},
                "big": {"type": "integer"},
                "small": {"type": "integer"}
            }
        });
        let out = HeuristicFieldExtractor
            .extract_schema("Count: 1e30\nBig: 99999999999999999999\nSmall: 1,024", &schema)
            .unwrap();
        assert_eq!(out["count"], Value::Null);
        assert_eq!(out["big"], Value::Null);
        assert_eq!(out["small"], json!(1024));
        assert_eq!(coerce("9223372036854775807", Some("integer")), json!(i64::MAX));
        assert_eq!(coerce("1e3", Some("integer")), json!(1000));
    }
}
