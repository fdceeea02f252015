//! Article records as stored and listed.

use serde::{Deserialize, Serialize};

use super::markers;
use super::title::Title;

/// Longest excerpt handed out in listings and generator context, in characters.
pub const EXCERPT_CHARS: usize = 600;

/// A stored encyclopedia page. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: Title,
    /// Generated markdown, possibly containing link and citation markers.
    pub body: String,
    /// Short search digest. `None` when summarization is off or failed.
    pub summary: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl Article {
    pub fn new(title: Title, body: String, summary: Option<String>) -> Self {
        Self {
            title,
            body,
            summary,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Outgoing link targets, deduplicated in order of appearance.
    pub fn links(&self) -> Vec<Title> {
        markers::link_targets(&self.body)
    }

    pub fn excerpt(&self) -> String {
        excerpt(&self.body, self.summary.as_deref())
    }
}

/// Listing entry for the home page.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleSummary {
    pub title: Title,
    pub excerpt: String,
    pub created_at: String,
}

/// One ranked full-text match. Higher `score` is more relevant.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub title: Title,
    pub excerpt: String,
    pub score: f64,
}

/// The summary when there is one, otherwise the head of the body.
pub fn excerpt(body: &str, summary: Option<&str>) -> String {
    match summary.map(str::trim).filter(|s| !s.is_empty()) {
        Some(summary) => summary.to_string(),
        None => truncate_chars(body.trim(), EXCERPT_CHARS),
    }
}

/// Cut `text` to at most `max` characters, appending `...` when shortened.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
