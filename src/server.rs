//! HTTP surface.
//!
//! [`router`] builds the axum app around a [`PageService`]; [`serve`] wires the
//! SQLite store and the OpenAI generator from config and runs it until ctrl-c.

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::article::{ArticleStore, SqliteArticleStore, Title};
use crate::config::WikiConfig;
use crate::error::WikiError;
use crate::generation::{ArticleGenerator, OpenAiGenerator};
use crate::render::page;
use crate::service::{PageOutcome, PageService, ServiceSettings};

/// Response header naming how the page request ended.
pub const OUTCOME_HEADER: &str = "x-page-outcome";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PageService>,
}

pub fn router(service: Arc<PageService>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/random", get(random))
        .route("/favicon.ico", get(favicon))
        .route("/{title}", get(article))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

async fn home(State(state): State<AppState>) -> Response {
    match state.service.home().await {
        Ok(listing) => Html(page::home_page(&listing.entries, listing.total)).into_response(),
        Err(WikiError::EmptyStore) => Html(page::empty_home_page()).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn random(State(state): State<AppState>) -> Response {
    match state.service.random_page().await {
        Ok(title) => Redirect::to(&title.url_path()).into_response(),
        Err(WikiError::EmptyStore) => Html(page::empty_random_page()).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn favicon() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn article(State(state): State<AppState>, Path(raw): Path<String>) -> Response {
    // one URL per article: send non-canonical spellings to the normalized path
    if !Title::is_canonical(&raw) {
        return match Title::parse(&raw) {
            Ok(title) => Redirect::permanent(&title.url_path()).into_response(),
            Err(e) => error_response(&e),
        };
    }

    let outcome = state.service.page(&raw).await;
    let label = outcome.label();
    match outcome {
        PageOutcome::Hit(a) | PageOutcome::Generated(a) | PageOutcome::RaceResolved(a) => {
            let mut response = Html(page::article_page(&a)).into_response();
            response
                .headers_mut()
                .insert(OUTCOME_HEADER, HeaderValue::from_static(label));
            response
        }
        PageOutcome::Failed(e) => error_response(&e),
    }
}

/// Status code and reader-facing text for a failure. Internal details stay in
/// the logs.
pub fn describe_error(err: &WikiError) -> (StatusCode, &'static str, String) {
    match err {
        WikiError::InvalidTitle(_) => (
            StatusCode::BAD_REQUEST,
            "Invalid title",
            "Titles need at least one letter or digit.".into(),
        ),
        WikiError::NotFound(title) => (
            StatusCode::NOT_FOUND,
            "Not found",
            format!("There is no article called {title}."),
        ),
        WikiError::Generation(_) => (
            StatusCode::BAD_GATEWAY,
            "The scribe lost the thread",
            "The article could not be written this time. Nothing was saved; reload to try again."
                .into(),
        ),
        WikiError::Upstream { timed_out: true, .. } => (
            StatusCode::GATEWAY_TIMEOUT,
            "The scribe is too slow today",
            "Writing this article took too long. Nothing was saved; reload to try again.".into(),
        ),
        WikiError::Upstream { .. } => (
            StatusCode::BAD_GATEWAY,
            "The scribe is unreachable",
            "The writing service could not be reached. Nothing was saved; reload to try again."
                .into(),
        ),
        WikiError::EmptyStore => (
            StatusCode::OK,
            "Nowhere",
            "There are no articles yet.".into(),
        ),
        WikiError::Conflict(_) | WikiError::Storage(_) | WikiError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something broke",
            "The library could not answer this request.".into(),
        ),
    }
}

fn error_response(err: &WikiError) -> Response {
    let (status, heading, message) = describe_error(err);
    if status.is_server_error() {
        tracing::error!(kind = err.kind(), error = %err, status = status.as_u16(), "request failed");
    }
    (status, Html(page::error_page(heading, &message))).into_response()
}

/// Build the production service from config.
pub fn build_service(config: &WikiConfig) -> Result<Arc<PageService>> {
    let db_path = config.resolved_db_path();
    let store = SqliteArticleStore::open(&db_path)?;
    let articles = store
        .count()
        .with_context(|| format!("failed to read article count from {}", db_path.display()))?;
    tracing::info!(db = %db_path.display(), articles, "database ready");

    let api_key = config.generation.resolve_api_key().with_context(|| {
        format!(
            "no generation API key: write one to {} or set OPENAI_API_KEY",
            config.generation.api_key_file
        )
    })?;
    let generator = OpenAiGenerator::new(config.generation.clone(), api_key)?;
    tracing::info!(model = generator.model(), api_base = %config.generation.api_base, "generator ready");

    store.with_conn(|conn| {
        crate::db::migrations::set_generation_model(conn, generator.model())?;
        Ok(())
    })?;

    Ok(Arc::new(PageService::new(
        Arc::new(store),
        Arc::new(generator),
        ServiceSettings::from(config),
    )))
}

/// Start the web server and block until ctrl-c.
pub async fn serve(config: WikiConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    let service = build_service(&config)?;
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "Infinite Library listening at http://{bind_addr}/");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
