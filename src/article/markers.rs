//! In-body annotations written by the generator.
//!
//! - link marker: `[[Target]]` or `[[Target|label]]`
//! - citation marker: `{{cite|Source title}}`
//!
//! Markers never span lines. An opener without a matching closer on the same
//! line is plain text.

use super::title::Title;

pub const LINK_OPEN: &str = "[[";
pub const LINK_CLOSE: &str = "]]";
pub const CITE_OPEN: &str = "{{cite|";
pub const CITE_CLOSE: &str = "}}";

/// A piece of body text, split around markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    /// `target` is `None` when the marker text normalizes to nothing.
    Link { target: Option<Title>, label: &'a str },
    Cite { source: Option<Title>, raw: &'a str },
}

#[derive(Clone, Copy)]
enum Kind {
    Link,
    Cite,
}

impl Kind {
    fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            Kind::Link => (LINK_OPEN, LINK_CLOSE),
            Kind::Cite => (CITE_OPEN, CITE_CLOSE),
        }
    }
}

/// Split `text` into plain runs and markers, in order.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let (start, kind) = match (rest.find(LINK_OPEN), rest.find(CITE_OPEN)) {
            (None, None) => {
                out.push(Segment::Text(rest));
                break;
            }
            (Some(link), Some(cite)) if cite < link => (cite, Kind::Cite),
            (Some(link), _) => (link, Kind::Link),
            (None, Some(cite)) => (cite, Kind::Cite),
        };

        let (open, close) = kind.delimiters();
        let inner_start = start + open.len();
        let closed = rest[inner_start..]
            .find(close)
            .filter(|&len| !rest[inner_start..inner_start + len].contains('\n'));

        match closed {
            Some(len) => {
                if start > 0 {
                    out.push(Segment::Text(&rest[..start]));
                }
                let inner = &rest[inner_start..inner_start + len];
                out.push(marker(kind, inner));
                rest = &rest[inner_start + len + close.len()..];
            }
            None => {
                // unmatched opener: emit it verbatim and keep scanning after it
                out.push(Segment::Text(&rest[..inner_start]));
                rest = &rest[inner_start..];
            }
        }
    }

    out
}

fn marker(kind: Kind, inner: &str) -> Segment<'_> {
    match kind {
        Kind::Link => {
            let (target, label) = match inner.split_once('|') {
                Some((target, label)) if !label.trim().is_empty() => (target, label.trim()),
                Some((target, _)) => (target, target.trim()),
                None => (inner, inner.trim()),
            };
            Segment::Link {
                target: Title::parse(target).ok(),
                label,
            }
        }
        Kind::Cite => Segment::Cite {
            source: Title::parse(inner).ok(),
            raw: inner.trim(),
        },
    }
}

/// Distinct link targets in order of first appearance.
pub fn link_targets(text: &str) -> Vec<Title> {
    let mut out: Vec<Title> = Vec::new();
    for segment in segments(text) {
        if let Segment::Link {
            target: Some(title),
            ..
        } = segment
        {
            if !out.contains(&title) {
                out.push(title);
            }
        }
    }
    out
}

/// Distinct cited sources in order of first appearance.
pub fn cited_sources(text: &str) -> Vec<Title> {
    let mut out: Vec<Title> = Vec::new();
    for segment in segments(text) {
        if let Segment::Cite {
            source: Some(title),
            ..
        } = segment
        {
            if !out.contains(&title) {
                out.push(title);
            }
        }
    }
    out
}
