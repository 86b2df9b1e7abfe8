use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Client for an OpenAI-compatible chat-completions endpoint. The model id is
/// a per-call argument because two models share the same credentials and URL.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// One completion round trip: a single user message in, the first
    /// choice's content back.
    pub async fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        debug!("Requesting completion from {} ({})", url, model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send completion request")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion API error ({}): {}", status, error_body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("No choices in completion response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    fn client_for(server: &MockServer) -> LlmClient {
        LlmClient::new(LlmConfig {
            api_key: "gsk-test".to_string(),
            base_url: server.url(""),
            chat_model: "llama-3.1-8b-instant".to_string(),
            reasoner_model: "deepseek-r1-distill-llama-70b".to_string(),
            max_tokens: 64,
        })
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer gsk-test")
                .body_contains("what is rust");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"choices":[{"message":{"role":"assistant","content":"a language"}}]}"#);
        });

        let reply = client_for(&server)
            .complete("llama-3.1-8b-instant", "what is rust")
            .await
            .unwrap();

        mock.assert();
        assert_eq!(reply, "a language");
    }

    #[tokio::test]
    async fn test_complete_sends_requested_model() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .body_contains("deepseek-r1-distill-llama-70b");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#);
        });

        client_for(&server)
            .complete("deepseek-r1-distill-llama-70b", "hi")
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_complete_fails_on_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(429).body("rate limited");
        });

        let err = client_for(&server)
            .complete("llama-3.1-8b-instant", "hi")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_complete_fails_on_empty_choices() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"choices":[]}"#);
        });

        let err = client_for(&server)
            .complete("llama-3.1-8b-instant", "hi")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No choices"));
    }
}
