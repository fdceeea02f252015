//! Articles: titles, in-body markers, storage, full-text search and context retrieval.

pub mod context;
pub mod markers;
pub mod search;
pub mod store;
pub mod title;
pub mod types;

pub use store::{ArticleStore, SqliteArticleStore};
pub use title::Title;
pub use types::{Article, ArticleSummary, SearchHit};
