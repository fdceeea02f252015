//! Context retrieval for the generator.

use super::store::ArticleStore;
use super::title::Title;
use super::types::SearchHit;

/// Pick up to `limit` stored articles relevant to `title`.
///
/// Never fails: a search error is logged and treated as "no context", since a
/// page without context is still a page.
pub fn retrieve_context(store: &dyn ArticleStore, title: &Title, limit: usize) -> Vec<SearchHit> {
    if limit == 0 {
        return Vec::new();
    }

    match store.search(&title.display(), limit + 1) {
        Ok(hits) => hits
            .into_iter()
            .filter(|hit| &hit.title != title)
            .take(limit)
            .collect(),
        Err(e) => {
            tracing::warn!(title = %title, error = %e, "context search failed, generating without context");
            Vec::new()
        }
    }
}
