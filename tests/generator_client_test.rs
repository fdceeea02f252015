use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wikiofbabel::article::{ArticleStore, SearchHit, SqliteArticleStore, Title};
use wikiofbabel::config::GenerationConfig;
use wikiofbabel::generation::{ArticleGenerator, OpenAiGenerator};
use wikiofbabel::service::{PageOutcome, PageService, ServiceSettings};
use wikiofbabel::WikiError;

/// How the fake Chat Completions endpoint answers.
#[derive(Clone, Copy)]
enum Behavior {
    Article,
    /// Article after a short delay, then a failing summary call.
    SummaryError,
    /// Article after a short delay, then a summary call that never answers in time.
    SummaryStall,
    ServerError,
    Malformed,
    Stall,
}

#[derive(Clone)]
struct Fake {
    behavior: Behavior,
    requests: Arc<AtomicUsize>,
    last_prompt: Arc<std::sync::Mutex<String>>,
}

const ARTICLE: &str =
    "# New New Paris\n\nNew New Paris is the successor of [[Old Paris]].{{cite|Old_Paris}}";

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

async fn chat_completions(State(fake): State<Fake>, Json(request): Json<Value>) -> Response {
    fake.requests.fetch_add(1, Ordering::SeqCst);
    let is_summary = request["max_tokens"] == 300;
    if !is_summary {
        let prompt = request["messages"][1]["content"].as_str().unwrap_or_default();
        *fake.last_prompt.lock().unwrap() = prompt.to_string();
    }

    match fake.behavior {
        Behavior::Article if is_summary => {
            Json(completion("A city rebuilt twice.")).into_response()
        }
        Behavior::Article => Json(completion(ARTICLE)).into_response(),
        Behavior::SummaryError if is_summary => {
            (StatusCode::INTERNAL_SERVER_ERROR, "summarizer down").into_response()
        }
        Behavior::SummaryStall if is_summary => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(completion("too late")).into_response()
        }
        Behavior::SummaryError | Behavior::SummaryStall => {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Json(completion(ARTICLE)).into_response()
        }
        Behavior::ServerError => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
        }
        Behavior::Malformed => (StatusCode::OK, "this is not json").into_response(),
        Behavior::Stall => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(completion("too late")).into_response()
        }
    }
}

/// Start a fake API on an ephemeral port and return its base URL.
async fn spawn_fake(behavior: Behavior) -> (String, Fake) {
    let fake = Fake {
        behavior,
        requests: Arc::new(AtomicUsize::new(0)),
        last_prompt: Arc::new(std::sync::Mutex::new(String::new())),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1"), fake)
}

fn generator(api_base: String, tweak: impl FnOnce(&mut GenerationConfig)) -> OpenAiGenerator {
    let mut config = GenerationConfig {
        api_base,
        model: "test-model".into(),
        max_retries: 0,
        timeout_secs: 10,
        ..GenerationConfig::default()
    };
    tweak(&mut config);
    OpenAiGenerator::new(config, "sk-test".into()).unwrap()
}

fn context() -> Vec<SearchHit> {
    vec![SearchHit {
        title: Title::parse("Old Paris").unwrap(),
        excerpt: "The first Paris.".into(),
        score: 1.0,
    }]
}

#[tokio::test]
async fn writes_article_and_summary() {
    let (base, fake) = spawn_fake(Behavior::Article).await;
    let generator = generator(base, |_| {});
    let title = Title::parse("New New Paris").unwrap();

    let article = generator.generate(&title, &context()).await.unwrap();

    assert_eq!(article.title, title);
    assert!(article.body.starts_with("New New Paris is the successor"));
    assert!(!article.body.contains("# New New Paris"));
    assert!(article.summary.is_none());
    assert_eq!(article.links(), vec![Title::parse("Old_Paris").unwrap()]);
    assert_eq!(fake.requests.load(Ordering::SeqCst), 1);

    let summary = generator.summarize(&article.body).await.unwrap();
    assert_eq!(summary.as_deref(), Some("A city rebuilt twice."));
    assert_eq!(fake.requests.load(Ordering::SeqCst), 2);

    let prompt = fake.last_prompt.lock().unwrap().clone();
    assert!(prompt.contains("From article about Old Paris:"));
    assert!(prompt.contains("The first Paris."));
}

#[tokio::test]
async fn summary_can_be_disabled() {
    let (base, fake) = spawn_fake(Behavior::Article).await;
    let generator = generator(base, |c| c.summarize = false);

    let article = generator
        .generate(&Title::parse("New New Paris").unwrap(), &[])
        .await
        .unwrap();

    assert!(generator.summarize(&article.body).await.unwrap().is_none());
    assert_eq!(fake.requests.load(Ordering::SeqCst), 1);
    assert!(fake
        .last_prompt
        .lock()
        .unwrap()
        .contains("No related articles found."));
}

#[tokio::test]
async fn server_error_is_upstream() {
    let (base, _) = spawn_fake(Behavior::ServerError).await;
    let generator = generator(base, |_| {});

    let err = generator
        .generate(&Title::parse("Atlantis").unwrap(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, WikiError::Upstream { timed_out: false, .. }), "got {err}");
}

#[tokio::test]
async fn server_error_is_retried() {
    let (base, fake) = spawn_fake(Behavior::ServerError).await;
    let generator = generator(base, |c| c.max_retries = 1);

    let err = generator
        .generate(&Title::parse("Atlantis").unwrap(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, WikiError::Upstream { .. }));
    assert_eq!(fake.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn malformed_response_is_a_generation_error() {
    let (base, fake) = spawn_fake(Behavior::Malformed).await;
    let generator = generator(base, |c| c.max_retries = 3);

    let err = generator
        .generate(&Title::parse("Atlantis").unwrap(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, WikiError::Generation(_)), "got {err}");
    assert_eq!(fake.requests.load(Ordering::SeqCst), 1, "bad output is not retried");
}

#[tokio::test]
async fn stalled_api_times_out() {
    let (base, _) = spawn_fake(Behavior::Stall).await;
    let generator = generator(base, |c| c.timeout_secs = 1);

    let err = generator
        .generate(&Title::parse("Slowtown").unwrap(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, WikiError::Upstream { timed_out: true, .. }), "got {err}");
}

#[tokio::test]
async fn unreachable_api_is_upstream() {
    // bind then drop, so nothing listens on the port
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let generator = generator(format!("http://{addr}/v1"), |_| {});

    let err = generator
        .generate(&Title::parse("Atlantis").unwrap(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, WikiError::Upstream { timed_out: false, .. }), "got {err}");
}

#[tokio::test]
async fn summary_error_leaves_article_intact() {
    let (base, _) = spawn_fake(Behavior::SummaryError).await;
    let generator = generator(base, |_| {});

    let article = generator
        .generate(&Title::parse("New New Paris").unwrap(), &[])
        .await
        .unwrap();
    assert!(article.body.starts_with("New New Paris is the successor"));

    let err = generator.summarize(&article.body).await.unwrap_err();
    assert!(matches!(err, WikiError::Upstream { .. }), "got {err}");
}

fn page_service(generator: OpenAiGenerator) -> (Arc<SqliteArticleStore>, PageService) {
    let store = Arc::new(SqliteArticleStore::open_in_memory().unwrap());
    let settings = ServiceSettings {
        generation_timeout: Duration::from_secs(1),
        summary_timeout: Duration::from_secs(1),
        ..ServiceSettings::default()
    };
    let service = PageService::new(store.clone(), Arc::new(generator), settings);
    (store, service)
}

#[tokio::test]
async fn stalled_summary_still_stores_the_page() {
    let (base, fake) = spawn_fake(Behavior::SummaryStall).await;
    let (store, service) = page_service(generator(base, |c| c.timeout_secs = 1));

    let outcome = service.page("New_Paris").await;
    assert!(matches!(outcome, PageOutcome::Generated(_)), "got {}", outcome.label());

    let stored = store.get(&Title::parse("New_Paris").unwrap()).unwrap();
    assert!(stored.summary.is_none());
    assert!(stored.body.starts_with("New New Paris is the successor"));
    assert_eq!(fake.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_summary_still_stores_the_page() {
    let (base, _) = spawn_fake(Behavior::SummaryError).await;
    let (store, service) = page_service(generator(base, |_| {}));

    let outcome = service.page("New_Paris").await;
    assert!(matches!(outcome, PageOutcome::Generated(_)), "got {}", outcome.label());
    assert_eq!(store.count().unwrap(), 1);
    assert!(outcome.article().unwrap().summary.is_none());
}
