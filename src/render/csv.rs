//! Table export as CSV.

use crate::error::ExtractError;
use crate::result::Table;

fn table_to_csv(table: &Table) -> Result<String, ExtractError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let rows = table.headers.iter().chain(table.rows.iter());
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| ExtractError::Internal(format!("CSV write failed: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExtractError::Internal(format!("CSV flush failed: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| ExtractError::Internal(format!("CSV output is not UTF-8: {e}")))?;
    Ok(text.trim_end_matches('\n').to_string())
}

/// Render `tables` as CSV.
///
/// With `include_all_tables` every table is preceded by `=== Table N ===`
/// and separated from the next by a blank line; otherwise only the first
/// table is written, without a delimiter.
pub fn render(tables: &[Table], include_all_tables: bool) -> Result<String, ExtractError> {
    let Some(first) = tables.first() else {
        return Err(ExtractError::NoTablesFound);
    };

    if !include_all_tables {
        return table_to_csv(first);
    }

    let blocks = tables
        .iter()
        .enumerate()
        .map(|(i, t)| Ok(format!("=== Table {} ===\n{}", i + 1, table_to_csv(t)?)))
        .collect::<Result<Vec<_>, ExtractError>>()?;
    Ok(blocks.join("\n\n"))
}
