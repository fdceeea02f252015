//! Normalized page titles.
//!
//! A [`Title`] is both the uniqueness key in the store and the URL path segment,
//! so every entry point (HTTP path, link marker, CLI argument) goes through
//! [`Title::parse`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WikiError;

/// Longest accepted normalized title, in bytes.
pub const MAX_TITLE_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Title(String);

impl Title {
    /// Normalize a raw title.
    ///
    /// Underscores count as spaces, anything other than ASCII letters, digits and
    /// whitespace is dropped, words are joined with `_`, and the first letter is
    /// upper-cased.
    pub fn parse(raw: &str) -> Result<Self, WikiError> {
        let cleaned: String = raw
            .chars()
            .map(|c| if c == '_' { ' ' } else { c })
            .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
            .collect();

        let mut normalized = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
        if normalized.is_empty() {
            return Err(WikiError::InvalidTitle(raw.to_string()));
        }
        if normalized.len() > MAX_TITLE_LEN {
            return Err(WikiError::InvalidTitle(format!(
                "title longer than {MAX_TITLE_LEN} characters"
            )));
        }

        // ASCII-only at this point, so byte 0 is a whole char
        normalized[..1].make_ascii_uppercase();
        Ok(Self(normalized))
    }

    /// Normalized form, e.g. `New_New_Paris`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable form, e.g. `New New Paris`.
    pub fn display(&self) -> String {
        self.0.replace('_', " ")
    }

    /// Page route for this title, e.g. `/New_New_Paris`.
    pub fn url_path(&self) -> String {
        format!("/{}", self.0)
    }

    /// `true` when `raw` is already in normalized form.
    pub fn is_canonical(raw: &str) -> bool {
        Self::parse(raw).map(|t| t.0 == raw).unwrap_or(false)
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Title {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Title {
    type Error = WikiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Title> for String {
    fn from(title: Title) -> Self {
        title.0
    }
}

impl std::str::FromStr for Title {
    type Err = WikiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
