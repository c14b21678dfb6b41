//! Minimal markdown-to-HTML renderer for note bodies.
//!
//! Supported: `#`..`###` headings, `> ` quotes, `- ` list items (grouped
//! into one `<ul>` per run), `**bold**`, `*italic*`, `` `code` `` and line
//! breaks. Anything else passes through as escaped text.
//!
//! # Invariants
//! - Source text is HTML-escaped before any markup is produced, so the
//!   output never contains caller-supplied tags.

use once_cell::sync::Lazy;
use regex::Regex;

static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`(.*?)`").expect("valid code regex"));
static BOLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold regex"));
static ITALIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("valid italic regex"));

enum Block<'a> {
    Heading(u8, &'a str),
    Quote(&'a str),
    ListItem(&'a str),
    Text(&'a str),
}

/// Renders `source` to an HTML fragment.
pub fn render_markdown(source: &str) -> String {
    let escaped = escape_html(source);
    let lines = escaped.lines().collect::<Vec<_>>();
    let mut html = String::with_capacity(escaped.len() + 32);
    let mut in_list = false;

    for (index, line) in lines.iter().enumerate() {
        let block = classify(line);
        let is_item = matches!(block, Block::ListItem(_));
        if is_item && !in_list {
            html.push_str("<ul>");
            in_list = true;
        } else if !is_item && in_list {
            html.push_str("</ul>");
            in_list = false;
        }

        match block {
            Block::Heading(level, text) => {
                html.push_str(&format!("<h{level}>{}</h{level}>", render_inline(text)));
            }
            Block::Quote(text) => {
                html.push_str(&format!("<blockquote>{}</blockquote>", render_inline(text)));
            }
            Block::ListItem(text) => {
                html.push_str(&format!("<li>{}</li>", render_inline(text)));
            }
            Block::Text(text) => html.push_str(&render_inline(text)),
        }

        if !is_item && index + 1 < lines.len() {
            html.push_str("<br>");
        }
    }

    if in_list {
        html.push_str("</ul>");
    }
    html
}

fn classify(line: &str) -> Block<'_> {
    if let Some(text) = line.strip_prefix("### ") {
        Block::Heading(3, text)
    } else if let Some(text) = line.strip_prefix("## ") {
        Block::Heading(2, text)
    } else if let Some(text) = line.strip_prefix("# ") {
        Block::Heading(1, text)
    } else if let Some(text) = line.strip_prefix("&gt; ") {
        // `>` was already escaped.
        Block::Quote(text)
    } else if let Some(text) = line.strip_prefix("- ") {
        Block::ListItem(text)
    } else {
        Block::Text(line)
    }
}

fn render_inline(text: &str) -> String {
    let with_code = CODE_RE.replace_all(text, "<code>$1</code>");
    let with_bold = BOLD_RE.replace_all(&with_code, "<strong>$1</strong>");
    ITALIC_RE
        .replace_all(&with_bold, "<em>$1</em>")
        .into_owned()
}

fn escape_html(source: &str) -> String {
    let mut escaped = String::with_capacity(source.len());
    for ch in source.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::render_markdown;

    #[test]
    fn headings_and_inline_markup() {
        assert_eq!(
            render_markdown("# Title\n**bold** and *it* with `code`"),
            "<h1>Title</h1><br><strong>bold</strong> and <em>it</em> with <code>code</code>"
        );
        assert_eq!(render_markdown("### Small"), "<h3>Small</h3>");
    }

    #[test]
    fn consecutive_list_items_share_one_list() {
        assert_eq!(
            render_markdown("intro\n- a\n- b\nafter"),
            "intro<br><ul><li>a</li><li>b</li></ul>after"
        );
    }

    #[test]
    fn quotes_survive_escaping_but_raw_html_does_not() {
        assert_eq!(render_markdown("> said"), "<blockquote>said</blockquote>");
        assert_eq!(
            render_markdown("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn empty_source_renders_empty() {
        assert_eq!(render_markdown(""), "");
    }
}
