//! Error taxonomy shared by the store, the generator and the page service.
//!
//! Only [`WikiError::Conflict`] is recovered locally (by re-reading the winning
//! article). Everything else propagates to the page service, which decides what
//! the reader sees.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WikiError {
    /// No article is stored under this title yet.
    #[error("article not found: {0}")]
    NotFound(String),

    /// Another writer stored the same title first.
    #[error("article already exists: {0}")]
    Conflict(String),

    /// The model answered, but the answer is not a usable article.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The generation API could not be reached, refused the request, or timed out.
    #[error("upstream error: {message}")]
    Upstream { message: String, timed_out: bool },

    /// The store holds no articles at all.
    #[error("no articles exist yet")]
    EmptyStore,

    /// The requested title normalizes to nothing usable.
    #[error("invalid title: {0}")]
    InvalidTitle(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type WikiResult<T> = Result<T, WikiError>;

impl WikiError {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            timed_out: true,
        }
    }

    /// Short machine-friendly kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Generation(_) => "generation",
            Self::Upstream { timed_out: true, .. } => "upstream_timeout",
            Self::Upstream { .. } => "upstream",
            Self::EmptyStore => "empty_store",
            Self::InvalidTitle(_) => "invalid_title",
            Self::Storage(_) => "storage",
            Self::Internal(_) => "internal",
        }
    }

    /// `true` when a primary-key or unique constraint rejected an insert.
    /// Other constraint failures (NOT NULL, CHECK) are real storage errors.
    pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

impl From<tokio::task::JoinError> for WikiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {err}"))
    }
}
