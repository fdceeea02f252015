#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wikiofbabel::article::{Article, SearchHit, SqliteArticleStore, Title};
use wikiofbabel::generation::ArticleGenerator;
use wikiofbabel::service::{PageService, ServiceSettings};
use wikiofbabel::{WikiError, WikiResult};

/// Fresh migrated in-memory store.
pub fn test_store() -> Arc<SqliteArticleStore> {
    Arc::new(SqliteArticleStore::open_in_memory().unwrap())
}

pub fn article(title: &str, body: &str) -> Article {
    Article::new(Title::parse(title).unwrap(), body.to_string(), None)
}

/// What a [`ScriptedGenerator`] does on each call.
#[derive(Clone)]
pub enum Script {
    /// Write a body that names the title and the call number.
    Write,
    /// Fail with the given error kind.
    Fail(fn() -> WikiError),
    /// Sleep, then write.
    Slow(Duration),
}

/// What a [`ScriptedGenerator`] does when asked for a summary.
#[derive(Clone)]
pub enum SummaryScript {
    Write,
    Fail,
    Stall(Duration),
}

/// Generator double that counts calls and remembers the context it was given.
pub struct ScriptedGenerator {
    script: Script,
    summary: SummaryScript,
    calls: AtomicUsize,
    contexts: Mutex<Vec<Vec<String>>>,
}

impl ScriptedGenerator {
    pub fn new(script: Script) -> Arc<Self> {
        Self::with_summary(script, SummaryScript::Write)
    }

    pub fn with_summary(script: Script, summary: SummaryScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            summary,
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Titles of the context articles passed on each call.
    pub fn contexts(&self) -> Vec<Vec<String>> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArticleGenerator for ScriptedGenerator {
    async fn generate(&self, title: &Title, context: &[SearchHit]) -> WikiResult<Article> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.contexts
            .lock()
            .unwrap()
            .push(context.iter().map(|h| h.title.to_string()).collect());

        match &self.script {
            Script::Write => {}
            Script::Fail(make) => return Err(make()),
            Script::Slow(delay) => tokio::time::sleep(*delay).await,
        }

        Ok(Article::new(
            title.clone(),
            format!(
                "{} is a place in the [[Outer Provinces]]. Draft {call}.",
                title.display()
            ),
            None,
        ))
    }

    async fn summarize(&self, body: &str) -> WikiResult<Option<String>> {
        match &self.summary {
            SummaryScript::Write => {}
            SummaryScript::Fail => return Err(WikiError::upstream("summary endpoint down")),
            SummaryScript::Stall(delay) => tokio::time::sleep(*delay).await,
        }
        let head: String = body.chars().take(20).collect();
        Ok(Some(format!("Summary: {head}")))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub fn service_with(
    store: Arc<SqliteArticleStore>,
    generator: Arc<ScriptedGenerator>,
) -> Arc<PageService> {
    Arc::new(PageService::new(store, generator, ServiceSettings::default()))
}

pub fn service_with_settings(
    store: Arc<SqliteArticleStore>,
    generator: Arc<ScriptedGenerator>,
    settings: ServiceSettings,
) -> Arc<PageService> {
    Arc::new(PageService::new(store, generator, settings))
}
