//! Markup helpers shared by processors and renderers.
//!
//! * HTML → Markdown conversion for web pages and `.html` files
//! * table discovery in Markdown pipe tables and HTML `<table>` blocks
//! * tag stripping and entity decoding
//!
//! Everything here is regex-based and deterministic. Inputs are
//! LLM-oriented documents, not arbitrary browsers' DOMs, so a full HTML
//! parser would buy little.

use crate::result::Table;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// ── Entities and tags ────────────────────────────────────────────────────

static RE_NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").unwrap());

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Decode the named entities that matter in practice plus numeric ones.
pub fn decode_entities(input: &str) -> String {
    let s = RE_NUMERIC_ENTITY.replace_all(input, |caps: &Captures<'_>| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Remove every tag, keeping the text between them.
pub fn strip_tags(input: &str) -> String {
    RE_TAG.replace_all(input, "").to_string()
}

/// Tag-free, entity-decoded, whitespace-collapsed text of an HTML fragment.
pub fn inline_text(fragment: &str) -> String {
    let text = decode_entities(&strip_tags(fragment));
    RE_SPACES
        .replace_all(&text.replace(['\n', '\r'], " "), " ")
        .trim()
        .to_string()
}

/// Collapse runs of 3+ newlines to one blank line and trim the ends.
pub fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").trim().to_string()
}

// ── Markdown pipe tables ─────────────────────────────────────────────────

/// A line that starts and ends with a pipe.
pub fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.ends_with('|') && trimmed.len() > 2
}

/// A GFM header separator such as `| --- | :---: |`.
pub fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|')
        && trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| c == '|' || c == '-' || c == ':' || c == ' ')
}

/// Split a pipe-table row into trimmed cells.
pub fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Byte offset and parsed table of every Markdown pipe table.
fn markdown_tables_with_offsets(content: &str) -> Vec<(usize, Table)> {
    let mut found = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut block_start = 0usize;
    let mut offset = 0usize;

    let flush = |block: &mut Vec<&str>, start: usize, found: &mut Vec<(usize, Table)>| {
        if block.len() >= 2 {
            let has_header = block.len() >= 2 && is_separator_row(block[1]);
            let rows: Vec<Vec<String>> = block
                .iter()
                .enumerate()
                .filter(|(i, l)| !(has_header && *i == 0) && !is_separator_row(l))
                .map(|(_, l)| split_row(l))
                .collect();
            let headers = has_header.then(|| split_row(block[0]));
            found.push((start, Table::new(headers, rows)));
        }
        block.clear();
    };

    for line in content.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if is_table_row(bare) {
            if block.is_empty() {
                block_start = offset;
            }
            block.push(bare);
        } else {
            flush(&mut block, block_start, &mut found);
        }
        offset += line.len();
    }
    flush(&mut block, block_start, &mut found);
    found
}

/// Every Markdown pipe table in `content`, in order.
pub fn parse_markdown_tables(content: &str) -> Vec<Table> {
    markdown_tables_with_offsets(content)
        .into_iter()
        .map(|(_, t)| t)
        .collect()
}

// ── HTML tables ──────────────────────────────────────────────────────────

static RE_HTML_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<table\b[^>]*>(.*?)</table\s*>").unwrap());

static RE_HTML_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").unwrap());

static RE_HTML_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<t([hd])\b[^>]*>(.*?)</t[hd]\s*>").unwrap());

/// Parse the inner HTML of one `<table>` element.
///
/// The first row becomes the header when all of its cells are `<th>`.
pub fn parse_html_table(inner: &str) -> Table {
    let mut headers = None;
    let mut rows = Vec::new();

    for (i, row) in RE_HTML_ROW.captures_iter(inner).enumerate() {
        let mut all_th = true;
        let cells: Vec<String> = RE_HTML_CELL
            .captures_iter(&row[1])
            .map(|cell| {
                if !cell[1].eq_ignore_ascii_case("h") {
                    all_th = false;
                }
                inline_text(&cell[2])
            })
            .collect();
        if cells.is_empty() {
            continue;
        }
        if i == 0 && all_th {
            headers = Some(cells);
        } else {
            rows.push(cells);
        }
    }

    Table::new(headers, rows)
}

fn html_tables_with_offsets(content: &str) -> Vec<(usize, Table)> {
    RE_HTML_TABLE
        .captures_iter(content)
        .filter_map(|caps| {
            let start = caps.get(0).map_or(0, |m| m.start());
            let table = parse_html_table(&caps[1]);
            (!table.is_empty()).then_some((start, table))
        })
        .collect()
}

/// Every HTML `<table>` in `content`, in order.
pub fn parse_html_tables(content: &str) -> Vec<Table> {
    html_tables_with_offsets(content)
        .into_iter()
        .map(|(_, t)| t)
        .collect()
}

/// Every table in `content`, HTML or Markdown, in document order.
pub fn extract_tables(content: &str) -> Vec<Table> {
    let mut all = html_tables_with_offsets(content);
    all.extend(markdown_tables_with_offsets(content));
    all.sort_by_key(|(offset, _)| *offset);
    all.into_iter().map(|(_, t)| t).collect()
}

// ── HTML → Markdown ──────────────────────────────────────────────────────

static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap());
static RE_DROP_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|head|template|svg)\b[^>]*>.*?</(script|style|noscript|head|template|svg)\s*>")
        .unwrap()
});
static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static RE_PRE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<pre\b[^>]*>(.*?)</pre\s*>").unwrap());
static RE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").unwrap());
static RE_IMG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<img\b([^>]*)>").unwrap());
static RE_ATTR_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\bsrc\s*=\s*["']([^"']*)["']"#).unwrap());
static RE_ATTR_ALT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\balt\s*=\s*["']([^"']*)["']"#).unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#).unwrap()
});
static RE_STRONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:strong|b)\b[^>]*>(.*?)</(?:strong|b)\s*>").unwrap());
static RE_EM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:em|i)\b[^>]*>(.*?)</(?:em|i)\s*>").unwrap());
static RE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<code\b[^>]*>(.*?)</code\s*>").unwrap());
static RE_BR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static RE_HR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<hr\b[^>]*>").unwrap());
static RE_LI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<li\b[^>]*>").unwrap());
static RE_BLOCKQUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<blockquote\b[^>]*>(.*?)</blockquote\s*>").unwrap());
static RE_BLOCK_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(?:p|div|section|article|header|footer|nav|main|aside|ul|ol|dl|dd|dt|figure|figcaption|body|html|form|fieldset)\b[^>]*>")
        .unwrap()
});

/// The document `<title>`, if any.
pub fn html_title(html: &str) -> Option<String> {
    RE_TITLE
        .captures(html)
        .map(|c| inline_text(&c[1]))
        .filter(|t| !t.is_empty())
}

/// Convert an HTML document to Markdown, returning the tables found in it.
///
/// Tables are rendered as pipe tables in place and also returned so the
/// caller can attach them to a result.
pub fn html_to_markdown(html: &str, include_images: bool) -> (String, Vec<Table>) {
    let s = RE_COMMENT.replace_all(html, "");
    let s = RE_DROP_BLOCKS.replace_all(&s, "");

    let mut tables = Vec::new();
    let s = RE_HTML_TABLE.replace_all(&s, |caps: &Captures<'_>| {
        let table = parse_html_table(&caps[1]);
        if table.is_empty() {
            return String::new();
        }
        let md = table.to_markdown();
        tables.push(table);
        format!("\n\n{md}\n\n")
    });

    let s = RE_PRE.replace_all(&s, |caps: &Captures<'_>| {
        let code = decode_entities(&strip_tags(&caps[1]));
        format!("\n\n```\n{}\n```\n\n", code.trim_matches('\n'))
    });
    let s = RE_HEADING.replace_all(&s, |caps: &Captures<'_>| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("\n\n{} {}\n\n", "#".repeat(level), inline_text(&caps[2]))
    });
    let s = RE_IMG.replace_all(&s, |caps: &Captures<'_>| {
        if !include_images {
            return String::new();
        }
        let attrs = &caps[1];
        let src = RE_ATTR_SRC.captures(attrs).map(|c| c[1].to_string());
        let alt = RE_ATTR_ALT
            .captures(attrs)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        match src {
            Some(src) if !src.is_empty() => format!("![{alt}]({src})"),
            _ => String::new(),
        }
    });
    let s = RE_LINK.replace_all(&s, |caps: &Captures<'_>| {
        let text = inline_text(&caps[2]);
        let href = &caps[1];
        if text.is_empty() {
            String::new()
        } else if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            text
        } else {
            format!("[{text}]({href})")
        }
    });
    let s = RE_STRONG.replace_all(&s, |caps: &Captures<'_>| wrap_inline(&caps[1], "**"));
    let s = RE_EM.replace_all(&s, |caps: &Captures<'_>| wrap_inline(&caps[1], "*"));
    let s = RE_CODE.replace_all(&s, |caps: &Captures<'_>| wrap_inline(&caps[1], "`"));
    let s = RE_BLOCKQUOTE.replace_all(&s, |caps: &Captures<'_>| {
        let inner = inline_text(&caps[1]);
        format!("\n\n> {inner}\n\n")
    });
    let s = RE_BR.replace_all(&s, "\n");
    let s = RE_HR.replace_all(&s, "\n\n---\n\n");
    let s = RE_LI.replace_all(&s, "\n- ");
    let s = RE_BLOCK_BOUNDARY.replace_all(&s, "\n\n");
    let s = decode_entities(&strip_tags(&s));

    let lines: Vec<String> = s
        .lines()
        .map(|line| RE_SPACES.replace_all(line, " ").trim().to_string())
        .collect();
    (collapse_blank_lines(&lines.join("\n")), tables)
}

fn wrap_inline(inner: &str, marker: &str) -> String {
    let text = inline_text(inner);
    if text.is_empty() {
        String::new()
    } else {
        format!("{marker}{text}{marker}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_common_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt; &#65;&#x42;"), "a & b <c> AB");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn split_row_handles_escaped_pipes() {
        assert_eq!(split_row("| a | b \\| c |"), vec!["a", "b | c"]);
    }

    #[test]
    fn separator_detection() {
        assert!(is_separator_row("| --- | :---: |"));
        assert!(!is_separator_row("| a | b |"));
        assert!(!is_separator_row("| |"));
    }

    #[test]
    fn markdown_table_with_header() {
        let md = "intro\n\n| A | B |\n| --- | --- |\n| 1 | 2 |\n| 3 | 4 |\n\noutro";
        let tables = parse_markdown_tables(md);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].headers, Some(vec!["A".into(), "B".into()]));
        assert_eq!(tables[0].rows.len(), 2);
    }

    #[test]
    fn single_pipe_line_is_not_a_table() {
        assert!(parse_markdown_tables("| lonely |").is_empty());
    }

    #[test]
    fn html_table_with_th_header() {
        let html = "<table><tr><th>Name</th><th>Age</th></tr><tr><td>Ann</td><td>3&nbsp;y</td></tr></table>";
        let tables = parse_html_tables(html);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].headers, Some(vec!["Name".into(), "Age".into()]));
        assert_eq!(tables[0].rows, vec![vec!["Ann".to_string(), "3 y".to_string()]]);
    }

    #[test]
    fn tables_are_returned_in_document_order() {
        let content = "| md | 1 |\n| --- | --- |\n| a | b |\n\n<table><tr><td>html</td></tr></table>\n\n| x | y |\n| 1 | 2 |";
        let tables = extract_tables(content);
        assert_eq!(tables.len(), 3);
        assert_eq!(tables[0].headers.as_ref().unwrap()[0], "md");
        assert_eq!(tables[1].rows[0][0], "html");
        assert_eq!(tables[2].rows[0][0], "x");
    }

    #[test]
    fn html_to_markdown_basics() {
        let html = r#"<html><head><title>T</title><style>p{}</style></head><body>
            <h1>Main</h1><p>Hello <b>bold</b> and <a href="https://x.org">link</a>.</p>
            <ul><li>one</li><li>two</li></ul>
            <script>alert(1)</script></body></html>"#;
        let (md, tables) = html_to_markdown(html, false);
        assert!(md.starts_with("# Main"), "got: {md}");
        assert!(md.contains("Hello **bold** and [link](https://x.org)."), "got: {md}");
        assert!(md.contains("- one\n- two"), "got: {md}");
        assert!(!md.contains("alert"));
        assert!(tables.is_empty());
    }

    #[test]
    fn html_to_markdown_images_follow_option() {
        let html = r#"<p><img src="a.png" alt="Chart"></p>"#;
        assert_eq!(html_to_markdown(html, true).0, "![Chart](a.png)");
        assert_eq!(html_to_markdown(html, false).0, "");
    }

    #[test]
    fn html_to_markdown_collects_tables() {
        let html = "<p>x</p><table><tr><th>k</th></tr><tr><td>v</td></tr></table>";
        let (md, tables) = html_to_markdown(html, false);
        assert_eq!(tables.len(), 1);
        assert!(md.contains("| k |\n| --- |\n| v |"), "got: {md}");
    }

    #[test]
    fn title_extraction() {
        assert_eq!(html_title("<title> Hi &amp; bye </title>"), Some("Hi & bye".into()));
        assert_eq!(html_title("<p>none</p>"), None);
    }
}
