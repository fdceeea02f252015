//! OpenAI-compatible Chat Completions client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::{Duration, Instant};

use super::parse::{extract_body, parse_completion};
use super::prompt::{article_user_prompt, ARTICLE_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT};
use super::ArticleGenerator;
use crate::article::{Article, SearchHit, Title};
use crate::config::GenerationConfig;
use crate::error::{WikiError, WikiResult};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
}

/// Generator backed by a `/chat/completions` endpoint.
pub struct OpenAiGenerator {
    config: GenerationConfig,
    api_key: String,
    client: Client,
}

impl OpenAiGenerator {
    pub fn new(config: GenerationConfig, api_key: String) -> WikiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| WikiError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }

    /// Send one chat request, retrying transient failures a bounded number of times.
    async fn chat(&self, request: &ChatCompletionsRequest<'_>) -> WikiResult<String> {
        let mut attempt = 0u32;
        loop {
            match self.try_chat(request).await {
                Ok(text) => return Ok(text),
                Err(Attempt::Retryable(err)) if attempt < self.config.max_retries => {
                    attempt += 1;
                    // Exponential backoff: 1s, 2s, 4s
                    let delay = Duration::from_secs(2u64.pow(attempt - 1));
                    tracing::warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %err,
                        "generation request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(Attempt::Retryable(err)) | Err(Attempt::Fatal(err)) => return Err(err),
            }
        }
    }

    async fn try_chat(&self, request: &ChatCompletionsRequest<'_>) -> Result<String, Attempt> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            let err = WikiError::upstream(format!(
                "generation API returned {status}: {}",
                crate::article::types::truncate_chars(text.trim(), 200)
            ));
            return Err(if is_retryable_status(status) {
                Attempt::Retryable(err)
            } else {
                Attempt::Fatal(err)
            });
        }

        parse_completion(&text).map_err(Attempt::Fatal)
    }

    async fn request_summary(&self, body: &str) -> WikiResult<String> {
        let request = ChatCompletionsRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SUMMARY_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: body,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: 300,
            presence_penalty: None,
            frequency_penalty: None,
        };
        Ok(self.chat(&request).await?.trim().to_string())
    }
}

enum Attempt {
    Retryable(WikiError),
    Fatal(WikiError),
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Timeouts are final (the caller's deadline is already spent); connection
/// failures are worth another try.
fn classify_transport_error(err: reqwest::Error) -> Attempt {
    if err.is_timeout() {
        Attempt::Fatal(WikiError::timeout(format!("generation API timed out: {err}")))
    } else if err.is_connect() || err.is_request() {
        Attempt::Retryable(WikiError::upstream(format!("generation API unreachable: {err}")))
    } else if err.is_decode() || err.is_body() {
        Attempt::Fatal(WikiError::Generation(format!("unreadable model response: {err}")))
    } else {
        Attempt::Fatal(WikiError::upstream(format!("generation API request failed: {err}")))
    }
}

#[async_trait]
impl ArticleGenerator for OpenAiGenerator {
    async fn generate(&self, title: &Title, context: &[SearchHit]) -> WikiResult<Article> {
        let started = Instant::now();
        let user_prompt = article_user_prompt(title, context);
        let request = ChatCompletionsRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ARTICLE_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            presence_penalty: Some(self.config.presence_penalty),
            frequency_penalty: Some(self.config.frequency_penalty),
        };

        let content = self.chat(&request).await?;
        let body = extract_body(&content)?;

        tracing::info!(
            title = %title,
            model = %self.config.model,
            body_len = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "article generated"
        );

        Ok(Article::new(title.clone(), body, None))
    }

    async fn summarize(&self, body: &str) -> WikiResult<Option<String>> {
        if !self.config.summarize {
            return Ok(None);
        }
        let summary = self.request_summary(body).await?;
        Ok(Some(summary).filter(|s| !s.is_empty()))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let config = GenerationConfig {
            api_base: "http://localhost:1234/v1/".into(),
            ..GenerationConfig::default()
        };
        let generator = OpenAiGenerator::new(config, "sk-test".into()).unwrap();
        assert_eq!(generator.endpoint(), "http://localhost:1234/v1/chat/completions");
        assert_eq!(generator.model(), "gpt-4o");
    }

    #[test]
    fn request_serializes_in_chat_completions_shape() {
        let request = ChatCompletionsRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.5,
            max_tokens: 10,
            presence_penalty: None,
            frequency_penalty: Some(0.5),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 10);
        assert!(json.get("presence_penalty").is_none());
        assert_eq!(json["frequency_penalty"], 0.5);
    }
}
