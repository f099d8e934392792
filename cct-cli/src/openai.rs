//! Chat-completions client behind the `Summarizer` seam.

use cct_core::summarizer::{build_prompt, SYSTEM_PROMPT};
use cct_core::{Summarizer, SummarizerError};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Calls an OpenAI-compatible `/chat/completions` endpoint, one request per clause.
pub struct OpenAiSummarizer {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiSummarizer {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, api_base: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .build();
        Self {
            agent,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, title: &str, body: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(title, body) },
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        })
    }
}

/// First choice's content, trimmed. Blank content is an empty response.
fn completion_text(response: ChatResponse) -> Result<String, SummarizerError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(SummarizerError::EmptyResponse)
}

impl Summarizer for OpenAiSummarizer {
    fn name(&self) -> &str {
        "openai"
    }

    fn summarize(&self, title: &str, body: &str) -> Result<String, SummarizerError> {
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_json(self.request_body(title, body))
            .map_err(|e| match e {
                ureq::Error::Status(code, response) => {
                    let detail = response.into_string().unwrap_or_default();
                    SummarizerError::Request(format!("HTTP {code}: {}", detail.trim()))
                }
                ureq::Error::Transport(transport) => SummarizerError::Request(transport.to_string()),
            })?;

        let parsed: ChatResponse = response
            .into_json()
            .map_err(|e| SummarizerError::Malformed(e.to_string()))?;
        completion_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ChatResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn endpoint_joins_base_without_double_slash() {
        let s = OpenAiSummarizer::new("k", "gpt-4.1-mini", "https://api.openai.com/v1/");
        assert_eq!(s.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn request_carries_system_and_user_messages() {
        let s = OpenAiSummarizer::new("k", "gpt-4.1-mini", "http://localhost");
        let body = s.request_body("CLÁUSULA PRIMEIRA - REAJUSTE", "Os salários serão reajustados.");
        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("Título: CLÁUSULA PRIMEIRA - REAJUSTE"));
        assert!(user.contains("Conteúdo: Os salários serão reajustados."));
    }

    #[test]
    fn first_choice_is_used() {
        let response = parse(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Reajuste de 5%. "}},
                           {"message":{"content":"outro"}}]}"#,
        );
        assert_eq!(completion_text(response).unwrap(), "Reajuste de 5%.");
    }

    #[test]
    fn missing_or_blank_content_is_empty_response() {
        for raw in [r#"{"choices":[]}"#, r#"{}"#, r#"{"choices":[{"message":{"content":"  "}}]}"#] {
            assert!(matches!(completion_text(parse(raw)), Err(SummarizerError::EmptyResponse)));
        }
    }

    #[test]
    fn unreachable_endpoint_is_a_request_error() {
        let s = OpenAiSummarizer::new("k", "m", "http://127.0.0.1:9");
        let err = s.summarize("T", "corpo").unwrap_err();
        assert!(matches!(err, SummarizerError::Request(_)));
    }
}
