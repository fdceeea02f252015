//! Page Service: lookup-or-generate for every page request.
//!
//! The store's uniqueness constraint is the only coordination between requests.
//! Two first requests for the same title may both generate; the second `put`
//! loses with `Conflict` and that request serves the winner's article instead.
//! No lock is held while the model is writing.

use std::sync::Arc;
use std::time::Duration;

use crate::article::context::retrieve_context;
use crate::article::{Article, ArticleStore, ArticleSummary, Title};
use crate::error::{WikiError, WikiResult};
use crate::generation::ArticleGenerator;

/// How a page request ended.
#[derive(Debug)]
pub enum PageOutcome {
    /// The article was already stored.
    Hit(Article),
    /// This request generated and stored the article.
    Generated(Article),
    /// A concurrent request stored the article first; this is its copy.
    RaceResolved(Article),
    /// Nothing to show. Nothing was stored.
    Failed(WikiError),
}

impl PageOutcome {
    pub fn article(&self) -> Option<&Article> {
        match self {
            Self::Hit(a) | Self::Generated(a) | Self::RaceResolved(a) => Some(a),
            Self::Failed(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Hit(_) => "hit",
            Self::Generated(_) => "generated",
            Self::RaceResolved(_) => "race-resolved",
            Self::Failed(_) => "failed",
        }
    }

    pub fn into_result(self) -> WikiResult<Article> {
        match self {
            Self::Hit(a) | Self::Generated(a) | Self::RaceResolved(a) => Ok(a),
            Self::Failed(e) => Err(e),
        }
    }
}

/// Home listing: the first articles plus how many exist in total.
#[derive(Debug)]
pub struct HomeListing {
    pub entries: Vec<ArticleSummary>,
    pub total: u64,
}

/// Tunables for [`PageService`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub context_articles: usize,
    pub home_limit: usize,
    /// Bound on the article completion.
    pub generation_timeout: Duration,
    /// Separate bound on the summary call. Expiry stores the article without one.
    pub summary_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            context_articles: 3,
            home_limit: 50,
            generation_timeout: Duration::from_secs(90),
            summary_timeout: Duration::from_secs(90),
        }
    }
}

impl From<&crate::config::WikiConfig> for ServiceSettings {
    fn from(config: &crate::config::WikiConfig) -> Self {
        Self {
            context_articles: config.retrieval.context_articles,
            home_limit: config.retrieval.home_limit,
            generation_timeout: Duration::from_secs(config.generation.timeout_secs.max(1)),
            summary_timeout: Duration::from_secs(config.generation.timeout_secs.max(1)),
        }
    }
}

pub struct PageService {
    store: Arc<dyn ArticleStore>,
    generator: Arc<dyn ArticleGenerator>,
    settings: ServiceSettings,
}

impl PageService {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        generator: Arc<dyn ArticleGenerator>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            generator,
            settings,
        }
    }

    /// Run `f` against the store on the blocking pool.
    async fn with_store<T, F>(&self, f: F) -> WikiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ArticleStore) -> WikiResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref())).await?
    }

    /// Serve the page for `raw_title`, generating it on first request.
    pub async fn page(&self, raw_title: &str) -> PageOutcome {
        let title = match Title::parse(raw_title) {
            Ok(title) => title,
            Err(e) => return PageOutcome::Failed(e),
        };

        let lookup = {
            let title = title.clone();
            self.with_store(move |store| store.get(&title)).await
        };
        match lookup {
            Ok(article) => return PageOutcome::Hit(article),
            Err(WikiError::NotFound(_)) => {}
            Err(e) => return PageOutcome::Failed(e),
        }

        let article = match self.generate(&title).await {
            Ok(article) => article,
            Err(e) => {
                tracing::error!(title = %title, kind = e.kind(), error = %e, "page generation failed");
                return PageOutcome::Failed(e);
            }
        };

        let stored = {
            let article = article.clone();
            self.with_store(move |store| store.put(&article)).await
        };
        match stored {
            Ok(()) => PageOutcome::Generated(article),
            Err(WikiError::Conflict(_)) => {
                tracing::info!(title = %title, "article was stored concurrently, serving the stored copy");
                let refetch = {
                    let title = title.clone();
                    self.with_store(move |store| store.get(&title)).await
                };
                match refetch {
                    Ok(winner) => PageOutcome::RaceResolved(winner),
                    Err(e) => PageOutcome::Failed(e),
                }
            }
            Err(e) => PageOutcome::Failed(e),
        }
    }

    /// Retrieve context, call the generator under the generation timeout, then
    /// attach a summary if one arrives within the summary timeout.
    async fn generate(&self, title: &Title) -> WikiResult<Article> {
        let context = {
            let title = title.clone();
            let limit = self.settings.context_articles;
            self.with_store(move |store| Ok(retrieve_context(store, &title, limit)))
                .await?
        };
        tracing::info!(
            title = %title,
            context_articles = context.len(),
            model = self.generator.model(),
            "generating article"
        );

        let timeout = self.settings.generation_timeout;
        let mut article = tokio::time::timeout(timeout, self.generator.generate(title, &context))
            .await
            .map_err(|_| {
                WikiError::timeout(format!("generation exceeded {}s", timeout.as_secs_f32()))
            })??;

        // the generator may not pick the stored key
        if &article.title != title {
            return Err(WikiError::Generation(format!(
                "generator answered for {} instead of {title}",
                article.title
            )));
        }

        article.summary = self.summarize(title, &article.body).await;
        Ok(article)
    }

    /// Never fails the page: errors and expiry are logged and yield `None`.
    async fn summarize(&self, title: &Title, body: &str) -> Option<String> {
        let timeout = self.settings.summary_timeout;
        match tokio::time::timeout(timeout, self.generator.summarize(body)).await {
            Ok(Ok(summary)) => summary.filter(|s| !s.trim().is_empty()),
            Ok(Err(e)) => {
                tracing::warn!(title = %title, kind = e.kind(), error = %e, "summary generation failed, storing without summary");
                None
            }
            Err(_) => {
                tracing::warn!(
                    title = %title,
                    timeout_secs = timeout.as_secs_f32(),
                    "summary generation timed out, storing without summary"
                );
                None
            }
        }
    }

    /// Home listing, or `EmptyStore` when nothing has been written yet.
    pub async fn home(&self) -> WikiResult<HomeListing> {
        let limit = self.settings.home_limit;
        let (entries, total) = self
            .with_store(move |store| Ok((store.list_all(Some(limit))?, store.count()?)))
            .await?;
        if total == 0 {
            return Err(WikiError::EmptyStore);
        }
        Ok(HomeListing { entries, total })
    }

    /// Title of a random stored article, or `EmptyStore`.
    pub async fn random_page(&self) -> WikiResult<Title> {
        self.with_store(|store| store.random().map(|a| a.title))
            .await
    }
}
