//! Deterministic cleanup of OCR transcriptions.
//!
//! Vision models follow the transcription instruction loosely: they wrap
//! answers in code fences, mix line endings, sprinkle zero-width characters
//! and emit pipe tables without a separator row. Each rule below fixes one
//! such quirk and is a pure `&str → String` function; [`clean_transcription`]
//! applies them in table order.
//!
//! Unlike page-to-Markdown cleanup, nothing is removed from the content
//! itself: `<img>`, `<watermark>` and `<page_number>` tags are part of the
//! requested output and survive untouched.

use crate::markup::{is_separator_row, is_table_row};
use once_cell::sync::Lazy;
use regex::Regex;

type Rule = fn(&str) -> String;

/// Cleanup rules in application order. Fences go first so later rules see
/// the real content; the blank-line pass runs after invisible characters are
/// gone so lines holding only a ZWSP count as blank.
const RULES: &[(&str, Rule)] = &[
    ("strip_outer_fence", strip_outer_fence),
    ("normalise_line_endings", normalise_line_endings),
    ("remove_invisible_chars", remove_invisible_chars),
    ("trim_line_ends", trim_line_ends),
    ("collapse_blank_runs", collapse_blank_runs),
    ("insert_missing_separator", insert_missing_separator),
    ("drop_body_separators", drop_body_separators),
];

/// Apply every cleanup rule and trim the result.
///
/// An empty or whitespace-only transcription stays empty.
pub fn clean_transcription(raw: &str) -> String {
    RULES
        .iter()
        .fold(raw.to_string(), |text, (_, rule)| rule(&text))
        .trim()
        .to_string()
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md|html|text)?[ \t]*\r?\n(.*?)\r?\n```$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'], "")
}

fn trim_line_ends(input: &str) -> String {
    input.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_runs(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").to_string()
}

/// A pipe table whose first two rows are both data rows gets a separator
/// inserted after the first, sized to its column count.
fn insert_missing_separator(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 4);

    for (i, line) in lines.iter().enumerate() {
        out.push((*line).to_string());
        let starts_table = is_table_row(line)
            && !is_separator_row(line)
            && (i == 0 || !is_table_row(lines[i - 1]));
        let next_is_data = lines
            .get(i + 1)
            .is_some_and(|next| is_table_row(next) && !is_separator_row(next));
        if starts_table && next_is_data {
            let columns = line.trim().matches('|').count().saturating_sub(1).max(1);
            out.push(format!("|{}", " --- |".repeat(columns)));
        }
    }
    out.join("\n")
}

/// Keep only the separator directly under a table's header row.
fn drop_body_separators(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut row_in_table = 0usize;

    for line in input.lines() {
        if is_table_row(line) {
            row_in_table += 1;
            if is_separator_row(line) && row_in_table != 2 {
                continue;
            }
        } else {
            row_in_table = 0;
        }
        out.push(line);
    }
    out.join("\n")
}
