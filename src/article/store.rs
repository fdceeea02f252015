//! Article Store: the only owner of persisted articles.
//!
//! The free functions work on a borrowed [`Connection`] and are what the CLI and
//! tests call directly. [`SqliteArticleStore`] wraps a connection behind a mutex
//! and implements [`ArticleStore`], the seam the page service depends on.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

use super::search;
use super::title::Title;
use super::types::{excerpt, Article, ArticleSummary, SearchHit};
use crate::error::{WikiError, WikiResult};

/// Read/write contract of the article store.
///
/// All methods are synchronous. Callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait ArticleStore: Send + Sync {
    /// Exact lookup by normalized title. `NotFound` when absent.
    fn get(&self, title: &Title) -> WikiResult<Article>;

    /// Insert a new article. `Conflict` when the title is already taken.
    fn put(&self, article: &Article) -> WikiResult<()>;

    /// Ranked full-text search, most relevant first, at most `limit` hits.
    fn search(&self, query: &str, limit: usize) -> WikiResult<Vec<SearchHit>>;

    /// One article picked at random. `EmptyStore` when there are none.
    fn random(&self) -> WikiResult<Article>;

    /// Articles in creation order, optionally capped.
    fn list_all(&self, limit: Option<usize>) -> WikiResult<Vec<ArticleSummary>>;

    fn count(&self) -> WikiResult<u64>;
}

/// SQLite-backed [`ArticleStore`].
pub struct SqliteArticleStore {
    conn: Mutex<Connection>,
}

impl SqliteArticleStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open (creating and migrating as needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(crate::db::open_database(path)?))
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(crate::db::open_memory_database()?))
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> WikiResult<T>) -> WikiResult<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| WikiError::Internal(format!("db lock poisoned: {e}")))?;
        f(&mut conn)
    }
}

impl ArticleStore for SqliteArticleStore {
    fn get(&self, title: &Title) -> WikiResult<Article> {
        self.with_conn(|conn| get_article(conn, title))
    }

    fn put(&self, article: &Article) -> WikiResult<()> {
        self.with_conn(|conn| put_article(conn, article))
    }

    fn search(&self, query: &str, limit: usize) -> WikiResult<Vec<SearchHit>> {
        self.with_conn(|conn| search::search_articles(conn, query, limit))
    }

    fn random(&self) -> WikiResult<Article> {
        self.with_conn(|conn| random_article(conn))
    }

    fn list_all(&self, limit: Option<usize>) -> WikiResult<Vec<ArticleSummary>> {
        self.with_conn(|conn| list_articles(conn, limit))
    }

    fn count(&self) -> WikiResult<u64> {
        self.with_conn(|conn| count_articles(conn))
    }
}

fn row_to_article(row: &Row<'_>) -> rusqlite::Result<Article> {
    let raw_title: String = row.get(0)?;
    let title = Title::parse(&raw_title).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Article {
        title,
        body: row.get(1)?,
        summary: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn get_article(conn: &Connection, title: &Title) -> WikiResult<Article> {
    conn.query_row(
        "SELECT title, body, summary, created_at FROM articles WHERE title = ?1",
        params![title.as_str()],
        row_to_article,
    )
    .optional()?
    .ok_or_else(|| WikiError::NotFound(title.to_string()))
}

/// Insert the article row and its FTS entry in one transaction.
///
/// The primary key on `title` is what makes concurrent first writes safe: the
/// loser gets [`WikiError::Conflict`] and nothing is written for it.
pub fn put_article(conn: &mut Connection, article: &Article) -> WikiResult<()> {
    let tx = conn.transaction()?;

    let inserted = tx.execute(
        "INSERT INTO articles (title, body, summary, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            article.title.as_str(),
            article.body,
            article.summary,
            article.created_at,
        ],
    );
    if let Err(e) = inserted {
        return Err(if WikiError::is_unique_violation(&e) {
            WikiError::Conflict(article.title.to_string())
        } else {
            e.into()
        });
    }
    let rowid = tx.last_insert_rowid();

    // Sync the FTS5 index, same rowid as the articles row. The unicode61
    // tokenizer splits on `_`, so the normalized title indexes as words.
    tx.execute(
        "INSERT INTO articles_fts (rowid, title, body, summary) VALUES (?1, ?2, ?3, ?4)",
        params![rowid, article.title.as_str(), article.body, article.summary],
    )?;

    tx.commit()?;
    tracing::debug!(title = %article.title, rowid, "article stored");
    Ok(())
}

pub fn random_article(conn: &Connection) -> WikiResult<Article> {
    conn.query_row(
        "SELECT title, body, summary, created_at FROM articles ORDER BY RANDOM() LIMIT 1",
        [],
        row_to_article,
    )
    .optional()?
    .ok_or(WikiError::EmptyStore)
}

pub fn list_articles(conn: &Connection, limit: Option<usize>) -> WikiResult<Vec<ArticleSummary>> {
    // SQLite treats a negative LIMIT as "no limit"
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    let mut stmt = conn.prepare(
        "SELECT title, body, summary, created_at FROM articles \
         ORDER BY created_at, rowid LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], row_to_article)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .map(|article| ArticleSummary {
            excerpt: excerpt(&article.body, article.summary.as_deref()),
            title: article.title,
            created_at: article.created_at,
        })
        .collect())
}

pub fn count_articles(conn: &Connection) -> WikiResult<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}
