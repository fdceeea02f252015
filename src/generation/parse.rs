//! Turning a Chat Completions response into article text.

use serde::Deserialize;

use crate::error::{WikiError, WikiResult};

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Decode a raw response body and return the first choice's text.
pub fn parse_completion(raw: &str) -> WikiResult<String> {
    let response: ChatCompletionResponse = serde_json::from_str(raw)
        .map_err(|e| WikiError::Generation(format!("unparseable model response: {e}")))?;
    completion_text(response)
}

pub fn completion_text(response: ChatCompletionResponse) -> WikiResult<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| WikiError::Generation("model response has no choices".into()))?;

    match choice.finish_reason.as_deref() {
        Some("content_filter") => {
            return Err(WikiError::Generation("model output was filtered".into()));
        }
        Some("length") => tracing::warn!("model output hit the token limit, keeping it truncated"),
        _ => {}
    }

    choice
        .message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| WikiError::Generation("model returned empty content".into()))
}

/// Clean model output into a page body.
///
/// Drops a wrapping code fence and a leading `# Title` line (the page renders
/// its own title). Fails when nothing readable is left.
pub fn extract_body(content: &str) -> WikiResult<String> {
    let mut text = content.trim();

    if text.starts_with("```") {
        text = text.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        text = text.trim_end();
        text = text.strip_suffix("```").unwrap_or(text).trim();
    }

    if let Some(first_line) = text.lines().next() {
        if first_line.starts_with("# ") || first_line == "#" {
            text = text[first_line.len()..].trim_start();
        }
    }

    let body = text.trim();
    if !body.chars().any(char::is_alphanumeric) {
        return Err(WikiError::Generation("model returned no article text".into()));
    }
    Ok(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(content: &str, finish: &str) -> String {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": finish
            }]
        })
        .to_string()
    }

    #[test]
    fn first_choice_content_is_returned() {
        let text = parse_completion(&response("## History\nOld.", "stop")).unwrap();
        assert_eq!(text, "## History\nOld.");
    }

    #[test]
    fn garbage_is_a_generation_error() {
        assert!(matches!(
            parse_completion("<html>oops</html>"),
            Err(WikiError::Generation(_))
        ));
    }

    #[test]
    fn missing_choices_or_content_fail() {
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#),
            Err(WikiError::Generation(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": [{"message": {"content": null}}]}"#),
            Err(WikiError::Generation(_))
        ));
        assert!(matches!(
            parse_completion(&response("   ", "stop")),
            Err(WikiError::Generation(_))
        ));
    }

    #[test]
    fn filtered_output_fails_but_truncated_output_is_kept() {
        assert!(parse_completion(&response("partial", "content_filter")).is_err());
        assert_eq!(parse_completion(&response("partial", "length")).unwrap(), "partial");
    }

    #[test]
    fn fence_and_heading_are_stripped() {
        let body = extract_body("```markdown\n# New Paris\n\nA city.\n## History\nOld.\n```").unwrap();
        assert_eq!(body, "A city.\n## History\nOld.");
    }

    #[test]
    fn h2_first_line_is_kept() {
        let body = extract_body("## Overview\nText").unwrap();
        assert_eq!(body, "## Overview\nText");
    }

    #[test]
    fn heading_only_output_is_rejected() {
        assert!(extract_body("# Title only").is_err());
        assert!(extract_body("```\n```").is_err());
        assert!(extract_body("---").is_err());
    }
}
