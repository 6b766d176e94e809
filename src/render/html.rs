//! Markdown → HTML.
//!
//! A line-oriented converter covering what processors and the OCR engine
//! actually emit: ATX headings, paragraphs, lists, block quotes, fenced
//! code, GFM pipe tables, horizontal rules, inline emphasis/code/links/
//! images. Lines that already start with an HTML tag are passed through
//! verbatim (OCR output carries HTML tables).

use crate::markup::{is_separator_row, is_table_row, split_row};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*#*\s*$").unwrap());
static RE_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:(?:-\s*){3,}|(?:\*\s*){3,}|(?:_\s*){3,})$").unwrap());
static RE_UL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").unwrap());
static RE_OL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+[.)]\s+(.*)$").unwrap());
static RE_RAW_HTML: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*</?[A-Za-z!][^>]*>").unwrap());

static RE_CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").unwrap());
static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").unwrap());
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\s][^*]*)\*").unwrap());
static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new("\u{0}(\\d+)\u{0}").unwrap());

/// Escape text for inclusion in HTML.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inline Markdown → HTML for one block of text.
fn inline(text: &str) -> String {
    // Code spans are pulled out first so their contents stay literal. NUL
    // delimits the placeholders, so none may survive from the input.
    let text = text.replace('\u{0}', "");
    let mut spans = Vec::new();
    let text = RE_CODE_SPAN.replace_all(&text, |caps: &Captures<'_>| {
        spans.push(format!("<code>{}</code>", escape(&caps[1])));
        format!("\u{0}{}\u{0}", spans.len() - 1)
    });

    let s = escape(&text);
    let s = RE_IMAGE.replace_all(&s, r#"<img src="$2" alt="$1">"#);
    let s = RE_LINK.replace_all(&s, r#"<a href="$2">$1</a>"#);
    let s = RE_BOLD.replace_all(&s, |caps: &Captures<'_>| {
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        format!("<strong>{inner}</strong>")
    });
    let s = RE_ITALIC.replace_all(&s, "<em>$1</em>");
    RE_PLACEHOLDER
        .replace_all(&s, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| spans.get(i).cloned())
                .unwrap_or_default()
        })
        .to_string()
}

fn render_table(lines: &[&str]) -> String {
    let has_header = lines.len() >= 2 && is_separator_row(lines[1]);
    let mut out = String::from("<table>\n");

    let body_start = if has_header {
        out.push_str("<thead>\n<tr>");
        for cell in split_row(lines[0]) {
            out.push_str(&format!("<th>{}</th>", inline(&cell)));
        }
        out.push_str("</tr>\n</thead>\n");
        2
    } else {
        0
    };

    out.push_str("<tbody>\n");
    for line in &lines[body_start..] {
        if is_separator_row(line) {
            continue;
        }
        out.push_str("<tr>");
        for cell in split_row(line) {
            out.push_str(&format!("<td>{}</td>", inline(&cell)));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>");
    out
}

/// Convert Markdown `content` to an HTML fragment wrapped in
/// `<div class="document">`.
pub fn render(content: &str) -> String {
    let body = render_body(content);
    if body.is_empty() {
        "<div class=\"document\"></div>".to_string()
    } else {
        format!("<div class=\"document\">\n{body}\n</div>")
    }
}

fn render_body(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut blocks: Vec<String> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed.is_empty() {
            i += 1;
            continue;
        }

        if let Some(info) = trimmed.strip_prefix("```") {
            let lang = info.trim();
            let mut code = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].trim_start().starts_with("```") {
                code.push(lines[i]);
                i += 1;
            }
            i += 1; // closing fence
            let class = if lang.is_empty() {
                String::new()
            } else {
                format!(r#" class="language-{}""#, escape(lang))
            };
            blocks.push(format!("<pre><code{class}>{}</code></pre>", escape(&code.join("\n"))));
            continue;
        }

        if let Some(caps) = RE_HEADING.captures(trimmed) {
            let level = caps[1].len();
            blocks.push(format!("<h{level}>{}</h{level}>", inline(&caps[2])));
            i += 1;
            continue;
        }

        if is_table_row(trimmed) {
            let start = i;
            while i < lines.len() && is_table_row(lines[i]) {
                i += 1;
            }
            blocks.push(render_table(&lines[start..i]));
            continue;
        }

        if RE_RULE.is_match(trimmed) {
            blocks.push("<hr>".to_string());
            i += 1;
            continue;
        }

        if trimmed.starts_with('>') {
            let mut quoted = Vec::new();
            while i < lines.len() && lines[i].trim_start().starts_with('>') {
                let l = lines[i].trim_start().trim_start_matches('>');
                quoted.push(l.strip_prefix(' ').unwrap_or(l));
                i += 1;
            }
            blocks.push(format!("<blockquote>\n{}\n</blockquote>", render_body(&quoted.join("\n"))));
            continue;
        }

        if RE_UL.is_match(line) || RE_OL.is_match(line) {
            let ordered = !RE_UL.is_match(line);
            let re: &Regex = if ordered { &RE_OL } else { &RE_UL };
            let mut items = Vec::new();
            while i < lines.len() {
                match re.captures(lines[i]) {
                    Some(caps) => items.push(format!("<li>{}</li>", inline(&caps[1]))),
                    None => break,
                }
                i += 1;
            }
            let tag = if ordered { "ol" } else { "ul" };
            blocks.push(format!("<{tag}>\n{}\n</{tag}>", items.join("\n")));
            continue;
        }

        if RE_RAW_HTML.is_match(line) {
            let mut raw = Vec::new();
            while i < lines.len() && !lines[i].trim().is_empty() {
                raw.push(lines[i]);
                i += 1;
            }
            blocks.push(raw.join("\n"));
            continue;
        }

        let mut para = Vec::new();
        while i < lines.len() {
            let l = lines[i];
            let t = l.trim();
            if t.is_empty()
                || t.starts_with("```")
                || t.starts_with('>')
                || RE_HEADING.is_match(t)
                || is_table_row(t)
                || RE_RULE.is_match(t)
                || RE_UL.is_match(l)
                || RE_OL.is_match(l)
            {
                break;
            }
            para.push(t);
            i += 1;
        }
        blocks.push(format!("<p>{}</p>", inline(&para.join("\n"))));
    }

    blocks.join("\n")
}
