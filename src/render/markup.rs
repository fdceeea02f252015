//! Article body → HTML.
//!
//! Bodies come from a model and are untrusted: every piece of text is escaped,
//! and the only tags in the output are the ones written here. Supported markdown
//! is the subset the prompt asks for: `#` headings, paragraphs, `-`/`*` and
//! numbered lists, `>` quotes, `---` rules, and `**`, `*`, `` ` `` emphasis.

use crate::article::markers::{self, Segment};
use crate::article::Title;

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(text, &mut out);
    out
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

enum Block {
    None,
    Paragraph(Vec<String>),
    List(ListKind, Vec<String>),
    Quote(Vec<String>),
}

/// Render a whole body. Citation numbers are shared across the body.
pub fn render_body(body: &str) -> String {
    let mut renderer = Renderer {
        html: String::new(),
        block: Block::None,
        citations: markers::cited_sources(body),
    };

    for line in body.lines() {
        renderer.line(line.trim());
    }
    renderer.flush();
    renderer.html
}

struct Renderer {
    html: String,
    block: Block,
    citations: Vec<Title>,
}

impl Renderer {
    fn line(&mut self, line: &str) {
        if line.is_empty() {
            self.flush();
            return;
        }

        if let Some((level, text)) = heading(line) {
            self.flush();
            // the page title is the only h1
            let level = level.max(2);
            let inner = self.inline(text);
            self.html.push_str(&format!("<h{level}>{inner}</h{level}>\n"));
            return;
        }

        if is_rule(line) {
            self.flush();
            self.html.push_str("<hr>\n");
            return;
        }

        if let Some((kind, item)) = list_item(line) {
            match &mut self.block {
                Block::List(open, items) if *open == kind => items.push(item.to_string()),
                _ => {
                    self.flush();
                    self.block = Block::List(kind, vec![item.to_string()]);
                }
            }
            return;
        }

        if let Some(quoted) = line.strip_prefix('>') {
            let quoted = quoted.trim_start().to_string();
            match &mut self.block {
                Block::Quote(lines) => lines.push(quoted),
                _ => {
                    self.flush();
                    self.block = Block::Quote(vec![quoted]);
                }
            }
            return;
        }

        match &mut self.block {
            Block::Paragraph(lines) => lines.push(line.to_string()),
            // a plain line right after a list item continues that item
            Block::List(_, items) => {
                if let Some(last) = items.last_mut() {
                    last.push(' ');
                    last.push_str(line);
                }
            }
            _ => {
                self.flush();
                self.block = Block::Paragraph(vec![line.to_string()]);
            }
        }
    }

    fn flush(&mut self) {
        match std::mem::replace(&mut self.block, Block::None) {
            Block::None => {}
            Block::Paragraph(lines) => {
                let inner = self.inline(&lines.join(" "));
                self.html.push_str(&format!("<p>{inner}</p>\n"));
            }
            Block::List(kind, items) => {
                let tag = match kind {
                    ListKind::Unordered => "ul",
                    ListKind::Ordered => "ol",
                };
                self.html.push_str(&format!("<{tag}>\n"));
                for item in items {
                    let inner = self.inline(&item);
                    self.html.push_str(&format!("<li>{inner}</li>\n"));
                }
                self.html.push_str(&format!("</{tag}>\n"));
            }
            Block::Quote(lines) => {
                let inner = self.inline(&lines.join(" "));
                self.html
                    .push_str(&format!("<blockquote><p>{inner}</p></blockquote>\n"));
            }
        }
    }

    fn inline(&self, text: &str) -> String {
        let mut out = String::new();
        let mut emphasis = Emphasis::default();

        for segment in markers::segments(text) {
            match segment {
                Segment::Text(t) => emphasis.render(t, &mut out),
                Segment::Link {
                    target: Some(title),
                    label,
                } => {
                    out.push_str(&format!(
                        "<a class=\"wikilink\" href=\"{}\">",
                        escape_html(&title.url_path())
                    ));
                    escape_into(label, &mut out);
                    out.push_str("</a>");
                }
                Segment::Link {
                    target: None,
                    label,
                } => escape_into(label, &mut out),
                Segment::Cite {
                    source: Some(title),
                    ..
                } => {
                    let number = self
                        .citations
                        .iter()
                        .position(|t| *t == title)
                        .map(|i| i + 1)
                        .unwrap_or(0);
                    out.push_str(&format!(
                        "<sup class=\"citation\"><a href=\"{}\" title=\"Source: {}\">[{number}]</a></sup>",
                        escape_html(&title.url_path()),
                        escape_html(&title.display()),
                    ));
                }
                Segment::Cite { source: None, raw } => {
                    out.push_str("<sup class=\"citation\">[");
                    escape_into(raw, &mut out);
                    out.push_str("]</sup>");
                }
            }
        }

        emphasis.close_all(&mut out);
        out
    }
}

/// Open inline tags, innermost last. Closing a tag closes everything opened
/// after it, so the output stays well-formed whatever the model wrote.
#[derive(Default)]
struct Emphasis {
    open: Vec<&'static str>,
}

impl Emphasis {
    fn toggle(&mut self, tag: &'static str, out: &mut String) {
        if let Some(pos) = self.open.iter().position(|t| *t == tag) {
            while self.open.len() > pos {
                if let Some(t) = self.open.pop() {
                    out.push_str(&format!("</{t}>"));
                }
            }
        } else {
            self.open.push(tag);
            out.push_str(&format!("<{tag}>"));
        }
    }

    fn in_code(&self) -> bool {
        self.open.last() == Some(&"code")
    }

    fn render(&mut self, text: &str, out: &mut String) {
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '`' {
                self.toggle("code", out);
                i += 1;
                continue;
            }
            if self.in_code() {
                escape_into(c.encode_utf8(&mut [0u8; 4]), out);
                i += 1;
                continue;
            }
            if c == '*' && chars.get(i + 1) == Some(&'*') {
                self.toggle("strong", out);
                i += 2;
                continue;
            }
            if c == '*' {
                let before_space = i == 0 || chars[i - 1].is_whitespace();
                let after_space = chars.get(i + 1).map_or(true, |n| n.is_whitespace());
                // a free-standing asterisk is literal, as in `5 * 3`
                if !(before_space && after_space) {
                    self.toggle("em", out);
                    i += 1;
                    continue;
                }
            }
            escape_into(c.encode_utf8(&mut [0u8; 4]), out);
            i += 1;
        }
    }

    fn close_all(&mut self, out: &mut String) {
        while let Some(t) = self.open.pop() {
            out.push_str(&format!("</{t}>"));
        }
    }
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if rest.is_empty() {
        return Some((level, ""));
    }
    rest.strip_prefix(' ')
        .map(|text| (level, text.trim().trim_end_matches('#').trim_end()))
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3
        && (line.chars().all(|c| c == '-')
            || line.chars().all(|c| c == '*')
            || line.chars().all(|c| c == '_'))
}

fn list_item(line: &str) -> Option<(ListKind, &str)> {
    if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some((ListKind::Unordered, item.trim()));
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(item) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some((ListKind::Ordered, item.trim()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_raw_html() {
        let html = render_body("<script>alert('x')</script> & \"q\"");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; &quot;q&quot;"));
    }

    #[test]
    fn link_markers_become_page_links() {
        let html = render_body("Founded by [[Jean de la Seine|Jean]] near [[old  paris]].");
        assert!(html.contains("<a class=\"wikilink\" href=\"/Jean_de_la_Seine\">Jean</a>"));
        assert!(html.contains("<a class=\"wikilink\" href=\"/Old_paris\">old  paris</a>"));
    }

    #[test]
    fn link_labels_are_escaped_and_targets_normalized() {
        let html = render_body("[[<b>Evil</b>\" onclick=\"x]]");
        assert!(!html.contains("<b>"));
        assert!(!html.contains("onclick=\""));
        assert!(html.contains("href=\"/BEvilb_onclickx\""));
    }

    #[test]
    fn unusable_link_target_renders_as_text() {
        let html = render_body("see [[!!!]]");
        assert_eq!(html, "<p>see !!!</p>\n");
    }

    #[test]
    fn citations_are_numbered_by_first_use() {
        let html = render_body("A {{cite|Old Rome}} B {{cite|Nile}} C {{cite|Old_Rome}}");
        assert!(html.contains("href=\"/Old_Rome\" title=\"Source: Old Rome\">[1]</a></sup>"));
        assert!(html.contains("href=\"/Nile\" title=\"Source: Nile\">[2]</a></sup>"));
        assert_eq!(html.matches("[1]").count(), 2);
    }

    #[test]
    fn citation_with_bad_source_is_still_marked() {
        let html = render_body("x {{cite|<?>}}");
        assert!(html.contains("<sup class=\"citation\">[&lt;?&gt;]</sup>"));
    }

    #[test]
    fn block_structure() {
        let body = "# Top\nIntro line one\nline two\n\n## History\n- first\n- second\ncontinued\n\n1. one\n2. two\n\n> quoted **words**\n\n---\nEnd";
        let html = render_body(body);
        assert_eq!(
            html,
            "<h2>Top</h2>\n\
             <p>Intro line one line two</p>\n\
             <h2>History</h2>\n\
             <ul>\n<li>first</li>\n<li>second continued</li>\n</ul>\n\
             <ol>\n<li>one</li>\n<li>two</li>\n</ol>\n\
             <blockquote><p>quoted <strong>words</strong></p></blockquote>\n\
             <hr>\n\
             <p>End</p>\n"
        );
    }

    #[test]
    fn emphasis_is_always_closed() {
        assert_eq!(render_body("**bold *both"), "<p><strong>bold <em>both</em></strong></p>\n");
        assert_eq!(render_body("**a *b** c"), "<p><strong>a <em>b</em></strong> c</p>\n");
        assert_eq!(render_body("5 * 3 = 15"), "<p>5 * 3 = 15</p>\n");
        assert_eq!(render_body("`<b>**x**</b>`"), "<p><code>&lt;b&gt;**x**&lt;/b&gt;</code></p>\n");
    }

    #[test]
    fn emphasis_spans_a_link() {
        let html = render_body("**[[New Paris]]** is a city.");
        assert_eq!(
            html,
            "<p><strong><a class=\"wikilink\" href=\"/New_Paris\">New Paris</a></strong> is a city.</p>\n"
        );
    }

    #[test]
    fn hashtag_is_not_a_heading() {
        assert_eq!(render_body("#tag"), "<p>#tag</p>\n");
    }
}
