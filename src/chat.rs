//! Chat generation backed by a local Ollama runtime.
//!
//! The chat layer is stateless: every request carries its own conversation
//! history, and the retrieval context is folded into the prompt before it is
//! handed to the provider. The Ollama client mirrors the embedding adapter by
//! issuing HTTP requests directly to the runtime.

use crate::config::get_config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Only the most recent turns are replayed into the prompt.
const MAX_HISTORY_TURNS: usize = 10;

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Errors surfaced while generating a chat response.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Provider was unreachable.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate response: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// A single prior message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Either `user` or `assistant`; other roles are ignored.
    pub role: String,
    /// Message text for the turn.
    pub content: String,
}

/// Interface implemented by chat generation providers.
#[async_trait]
pub trait GeneratorClient: Send + Sync {
    /// Generate a completion for an assembled prompt.
    async fn generate(&self, prompt: String) -> Result<String, GeneratorError>;
}

#[async_trait]
impl GeneratorClient for Box<dyn GeneratorClient + Send + Sync> {
    async fn generate(&self, prompt: String) -> Result<String, GeneratorError> {
        (**self).generate(prompt).await
    }
}

/// Build a generator client based on configuration.
pub fn get_generator_client() -> Box<dyn GeneratorClient + Send + Sync> {
    let config = get_config();
    let base_url = config
        .ollama_url
        .clone()
        .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
    Box::new(OllamaGenerator::new(base_url, config.generator_model.clone()))
}

/// Fold the system prompt, retrieval context, and conversation history into
/// a single completion prompt ending with an open assistant turn.
pub fn build_prompt(history: &[ChatTurn], context: &str, message: &str) -> String {
    let mut prompt = format!("{SYSTEM_PROMPT}\n\n");

    if !context.is_empty() {
        prompt.push_str(&format!("Context from documents:\n{context}\n\n"));
        prompt.push_str("Please use the above context to answer the user's question when relevant.\n\n");
    }

    let recent = if history.len() > MAX_HISTORY_TURNS {
        &history[history.len() - MAX_HISTORY_TURNS..]
    } else {
        history
    };
    for turn in recent {
        match turn.role.as_str() {
            "user" => prompt.push_str(&format!("User: {}\n", turn.content)),
            "assistant" => prompt.push_str(&format!("Assistant: {}\n", turn.content)),
            _ => {}
        }
    }

    prompt.push_str(&format!("User: {message}\nAssistant:"));
    prompt
}

struct OllamaGenerator {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    fn new(base_url: String, model: String) -> Self {
        let http = Client::builder()
            .user_agent("docrag/chat")
            .build()
            .expect("Failed to construct reqwest::Client for chat generation");
        Self {
            http,
            base_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl GeneratorClient for OllamaGenerator {
    async fn generate(&self, prompt: String) -> Result<String, GeneratorError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.7,
                "num_predict": 1000,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GeneratorError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GeneratorError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            GeneratorError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(GeneratorError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn test_client(base_url: String) -> OllamaGenerator {
        OllamaGenerator {
            http: Client::builder()
                .user_agent("docrag-test")
                .build()
                .expect("client"),
            base_url,
            model: "llama3.2".into(),
        }
    }

    #[test]
    fn prompt_includes_context_and_history() {
        let history = vec![
            ChatTurn {
                role: "user".into(),
                content: "Hi".into(),
            },
            ChatTurn {
                role: "assistant".into(),
                content: "Hello".into(),
            },
            ChatTurn {
                role: "system".into(),
                content: "ignored".into(),
            },
        ];

        let prompt = build_prompt(&history, "[Source: a.txt #0]\nalpha", "What is alpha?");

        assert!(prompt.starts_with("You are a helpful assistant."));
        assert!(prompt.contains("Context from documents:\n[Source: a.txt #0]\nalpha"));
        assert!(prompt.contains("User: Hi\nAssistant: Hello\n"));
        assert!(!prompt.contains("ignored"));
        assert!(prompt.ends_with("User: What is alpha?\nAssistant:"));
    }

    #[test]
    fn prompt_without_context_omits_document_block() {
        let prompt = build_prompt(&[], "", "Hello there");
        assert!(!prompt.contains("Context from documents"));
        assert!(prompt.ends_with("User: Hello there\nAssistant:"));
    }

    #[test]
    fn prompt_truncates_old_history() {
        let history: Vec<ChatTurn> = (0..15)
            .map(|i| ChatTurn {
                role: "user".into(),
                content: format!("turn-{i}"),
            })
            .collect();

        let prompt = build_prompt(&history, "", "latest");
        assert!(!prompt.contains("turn-4\n"));
        assert!(prompt.contains("turn-5\n"));
        assert!(prompt.contains("turn-14\n"));
    }

    #[tokio::test]
    async fn ollama_generator_handles_successful_response() {
        let server = MockServer::start_async().await;
        let client = test_client(server.base_url());

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "Generated text",
                    "done": true
                }));
            })
            .await;

        let answer = client
            .generate("Answer the question".into())
            .await
            .expect("response");

        mock.assert();
        assert_eq!(answer, "Generated text");
    }

    #[tokio::test]
    async fn ollama_generator_handles_error_status() {
        let server = MockServer::start_async().await;
        let client = test_client(server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client
            .generate("Answer the question".into())
            .await
            .expect_err("error response");

        assert!(matches!(error, GeneratorError::GenerationFailed(message) if message.contains("500")));
    }

    #[tokio::test]
    async fn ollama_generator_rejects_incomplete_response() {
        let server = MockServer::start_async().await;
        let client = test_client(server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "partial",
                    "done": false
                }));
            })
            .await;

        let error = client
            .generate("Answer".into())
            .await
            .expect_err("incomplete response");

        assert!(matches!(error, GeneratorError::InvalidResponse(_)));
    }
}
