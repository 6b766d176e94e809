//! Markdown/HTML → plain text.

use crate::markup::{collapse_blank_lines, decode_entities, is_separator_row, is_table_row, split_row, strip_tags};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#{1,6}\s+").unwrap());
static RE_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*>\s?").unwrap());
static RE_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:(?:-\s*){3,}|(?:\*\s*){3,}|(?:_\s*){3,})$").unwrap());
static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").unwrap());
static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").unwrap());
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\s][^*]*)\*").unwrap());
static RE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());

static RE_CELL_GAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</t[dh]>\s*<t[dh]\b[^>]*>").unwrap());
static RE_ROW_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</tr\s*>").unwrap());
static RE_HTML_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</?(?:p|div|table|thead|tbody|h[1-6]|li|ul|ol|blockquote)\b[^>]*>").unwrap()
});

fn strip_inline(line: &str) -> String {
    let s = RE_IMAGE.replace_all(line, "$1");
    let s = RE_LINK.replace_all(&s, "$1");
    let s = RE_CODE.replace_all(&s, "$1");
    let s = RE_BOLD.replace_all(&s, "$1$2");
    RE_ITALIC.replace_all(&s, "$1").to_string()
}

/// Strip Markdown and HTML markup from `content`, keeping the text.
///
/// Table cells (pipe or HTML) become tab-separated; blank-line runs are
/// collapsed to one.
pub fn render(content: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            out.push(line.to_string());
            continue;
        }
        if is_table_row(trimmed) {
            if !is_separator_row(trimmed) {
                let cells: Vec<String> = split_row(trimmed).iter().map(|c| strip_inline(c)).collect();
                out.push(cells.join("\t"));
            }
            continue;
        }
        if RE_RULE.is_match(trimmed) {
            out.push(String::new());
            continue;
        }
        let l = RE_HEADING.replace(line, "");
        let l = RE_QUOTE.replace(&l, "");
        out.push(strip_inline(&l));
    }

    let joined = out.join("\n");
    let s = RE_CELL_GAP.replace_all(&joined, "\t");
    let s = RE_ROW_END.replace_all(&s, "\n");
    let s = RE_HTML_BREAK.replace_all(&s, "\n");
    let s = decode_entities(&strip_tags(&s));

    let lines: Vec<&str> = s.lines().map(str::trim_end).collect();
    collapse_blank_lines(&lines.join("\n"))
}
