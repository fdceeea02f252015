//! Article generation.
//!
//! [`ArticleGenerator`] is the seam between the page service and the model. The
//! production implementation is [`openai::OpenAiGenerator`]; tests substitute
//! their own.

pub mod openai;
pub mod parse;
pub mod prompt;

use async_trait::async_trait;

use crate::article::{Article, SearchHit, Title};
use crate::error::WikiResult;

/// Writes a new article for a title. Never touches the store.
#[async_trait]
pub trait ArticleGenerator: Send + Sync {
    /// Produce an article for `title`, grounded on `context`. The returned
    /// article carries no summary; see [`ArticleGenerator::summarize`].
    ///
    /// Fails with `Generation` when the model output is unusable and with
    /// `Upstream` when the model could not be reached in time.
    async fn generate(&self, title: &Title, context: &[SearchHit]) -> WikiResult<Article>;

    /// Short search digest of an article body. `Ok(None)` when this generator
    /// does not summarize.
    async fn summarize(&self, _body: &str) -> WikiResult<Option<String>> {
        Ok(None)
    }

    /// Identifier of the underlying model, for logs and diagnostics.
    fn model(&self) -> &str;
}

pub use openai::OpenAiGenerator;
