//! Full HTML pages.

use super::markup::{escape_html, render_body};
use crate::article::{Article, ArticleSummary, Title};

pub const SITE_NAME: &str = "Infinite Library";

/// Where the empty-state pages send a first-time visitor.
pub const SUGGESTED_TITLE: &str = "The great Emu War";

const STYLE: &str = "\
body {
    max-width: 800px;
    margin: 0 auto;
    padding: 20px;
    font-family: system-ui, -apple-system, sans-serif;
    line-height: 1.6;
}
a.wikilink { color: #0645ad; }
sup.citation { font-size: 0.75em; color: #555; }
sup.citation a { text-decoration: none; }
blockquote { border-left: 3px solid #ccc; margin-left: 0; padding-left: 1em; color: #444; }
.meta { color: #777; font-size: 0.85em; }
.excerpt { color: #555; font-size: 0.9em; }";

/// Wrap already-rendered HTML in the site layout. `heading` is plain text.
pub fn layout(heading: &str, content_html: &str) -> String {
    let heading = escape_html(heading);
    format!(
        r#"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <title>{heading} - {SITE_NAME}</title>
        <style>
{STYLE}
        </style>
    </head>
    <body>
        <h1>{heading}</h1>
{content_html}
        <hr>
        <i><a href="/random">Random page</a> &middot; <a href="/">Home</a></i>
    </body>
</html>
"#
    )
}

pub fn article_page(article: &Article) -> String {
    let mut content = render_body(&article.body);
    content.push_str(&format!(
        "<p class=\"meta\">Written {}</p>\n",
        escape_html(&article.created_at)
    ));
    layout(&article.title.display(), &content)
}

/// Home listing. `total` may exceed `entries.len()` when the listing is capped.
pub fn home_page(entries: &[ArticleSummary], total: u64) -> String {
    let mut content = String::from(
        "<p>You can go anywhere and we will auto-generate a new page for every keyword.</p>\n",
    );
    content.push_str(&format!(
        "<h2>The first {} pages</h2>\n<ul>\n",
        entries.len()
    ));
    for entry in entries {
        content.push_str(&format!(
            "<li><a class=\"wikilink\" href=\"{}\">{}</a></li>\n",
            escape_html(&entry.title.url_path()),
            escape_html(&entry.title.display()),
        ));
    }
    content.push_str("</ul>\n");
    let hidden = total.saturating_sub(entries.len() as u64);
    if hidden > 0 {
        content.push_str(&format!("<p class=\"meta\">and {hidden} more.</p>\n"));
    }
    layout("The infinite library", &content)
}

fn suggestion() -> String {
    let title = Title::parse(SUGGESTED_TITLE).map(|t| t.url_path()).unwrap_or_default();
    format!(
        "<a class=\"wikilink\" href=\"{}\">{}</a>",
        escape_html(&title),
        escape_html(SUGGESTED_TITLE)
    )
}

pub fn empty_home_page() -> String {
    let content = format!(
        "<p>The library is empty. Every page is written the first time someone asks for it.</p>\n\
         <p>Why not start with {}?</p>\n",
        suggestion()
    );
    layout("The infinite library", &content)
}

pub fn empty_random_page() -> String {
    let content = format!(
        "<p>There is nothing to pick from yet. Do you want to try something? Like {}</p>\n",
        suggestion()
    );
    layout("Nowhere", &content)
}

/// Error page. `message` is plain text.
pub fn error_page(heading: &str, message: &str) -> String {
    let content = format!("<p>{}</p>\n", escape_html(message));
    layout(heading, &content)
}
