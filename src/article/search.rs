use rusqlite::{params, Connection};

use super::title::Title;
use super::types::{excerpt, SearchHit};
use crate::error::WikiResult;

/// Column weights for bm25: title, body, summary.
const BM25_WEIGHTS: &str = "10.0, 1.0, 3.0";

/// Ranked FTS5 search over title, body and summary.
///
/// Any query word may match (`OR`), so a multi-word title still finds articles
/// that share only part of it. Returns at most `limit` hits, best first, and an
/// empty list when the query has no searchable words.
pub fn search_articles(conn: &Connection, query: &str, limit: usize) -> WikiResult<Vec<SearchHit>> {
    let fts_query = escape_fts_query(query);
    if fts_query.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT title, body, summary, bm25(articles_fts, {BM25_WEIGHTS}) AS score \
         FROM articles_fts WHERE articles_fts MATCH ?1 \
         ORDER BY score LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![fts_query, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let hits = rows
        .into_iter()
        .filter_map(|(title, body, summary, bm25)| {
            let title = Title::parse(&title).ok()?;
            Some(SearchHit {
                title,
                excerpt: excerpt(&body, summary.as_deref()),
                // bm25() is lower-is-better; flip it so callers sort descending
                score: -bm25,
            })
        })
        .collect();
    Ok(hits)
}

/// Escape free text for FTS5 MATCH syntax.
///
/// Underscores become spaces, each word is wrapped in double quotes so FTS5
/// operators in user text are inert, and the words are joined with `OR`.
fn escape_fts_query(query: &str) -> String {
    query
        .replace('_', " ")
        .split_whitespace()
        .map(|word| word.replace('"', ""))
        .filter(|word| !word.is_empty())
        .map(|word| format!("\"{word}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}
