//! Chat-completion collaborator.
//!
//! [`CompletionClient`] is the seam between the assistant and the model
//! provider. [`GroqClient`] talks to an OpenAI-compatible
//! `/chat/completions` endpoint (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use tripleloop_shared::{CompletionConfig, Result, TripleLoopError, resolve_api_key};

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("tripleloop/", env!("CARGO_PKG_VERSION"));

/// Returned to the user when the provider answers without any content.
pub const NO_ANSWER_TEXT: &str = "Entschuldigung, ich konnte keine Antwort generieren.";

/// Longest slice of an error body kept in error messages.
const ERROR_BODY_PREVIEW: usize = 200;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of a `/chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// A generated answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client trait
// ---------------------------------------------------------------------------

/// Anything that can turn a chat request into generated text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

// ---------------------------------------------------------------------------
// Groq / OpenAI-compatible HTTP client
// ---------------------------------------------------------------------------

/// HTTP client for an OpenAI-compatible chat-completions API.
#[derive(Debug, Clone)]
pub struct GroqClient {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl GroqClient {
    /// Build a client with an explicit API key.
    pub fn new(config: &CompletionConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TripleLoopError::config("completion API key is empty"));
        }

        Ok(Self {
            http: build_client(config.timeout_secs)?,
            endpoint: completions_endpoint(&config.base_url)?,
            api_key,
        })
    }

    /// Build a client, reading the API key from the configured env var.
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        let api_key = resolve_api_key(config)?;
        Self::new(config, api_key)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let endpoint = self.endpoint.as_str();

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| TripleLoopError::Network(format!("{endpoint}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(TripleLoopError::Network(format!(
                "{endpoint}: HTTP {status}: {preview}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TripleLoopError::completion(format!("invalid response body: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|text| !text.trim().is_empty());

        let text = match content {
            Some(text) => text,
            None => {
                warn!("completion response carried no content");
                NO_ANSWER_TEXT.to_string()
            }
        };

        debug!(
            prompt_tokens = parsed.usage.prompt_tokens,
            completion_tokens = parsed.usage.completion_tokens,
            "completion received"
        );

        Ok(Completion {
            text,
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
            usage: parsed.usage,
        })
    }
}

fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TripleLoopError::Network(format!("failed to build HTTP client: {e}")))
}

/// `{base_url}/chat/completions`, regardless of a trailing slash on the base.
fn completions_endpoint(base_url: &Url) -> Result<Url> {
    let base = base_url.as_str().trim_end_matches('/');
    Url::parse(&format!("{base}/chat/completions"))
        .map_err(|e| TripleLoopError::config(format!("invalid completion base_url: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(server: &wiremock::MockServer) -> CompletionConfig {
        CompletionConfig {
            base_url: Url::parse(&format!("{}/openai/v1", server.uri())).unwrap(),
            timeout_secs: 5,
            ..CompletionConfig::default()
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "llama-3.3-70b-versatile".into(),
            messages: vec![
                ChatMessage::system("Du bist ein Experte."),
                ChatMessage::user("Was ist Loop 2?"),
            ],
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    #[test]
    fn endpoint_appends_path() {
        let with_slash = Url::parse("https://api.groq.com/openai/v1/").unwrap();
        let without = Url::parse("https://api.groq.com/openai/v1").unwrap();
        let expected = "https://api.groq.com/openai/v1/chat/completions";
        assert_eq!(completions_endpoint(&with_slash).unwrap().as_str(), expected);
        assert_eq!(completions_endpoint(&without).unwrap().as_str(), expected);
    }

    #[test]
    fn request_serializes_lowercase_roles() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 1024);
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(GroqClient::new(&CompletionConfig::default(), "  ").is_err());
    }

    #[tokio::test]
    async fn complete_parses_answer_and_usage() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/openai/v1/chat/completions"))
            .and(wiremock::matchers::header("authorization", "Bearer test-key"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({
                    "model": "llama-3.3-70b-versatile",
                    "choices": [
                        { "message": { "role": "assistant", "content": "Loop 2 ist die Aktivierung." } }
                    ],
                    "usage": { "prompt_tokens": 120, "completion_tokens": 8, "total_tokens": 128 }
                }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = GroqClient::new(&config_for(&server), "test-key").unwrap();
        let completion = client.complete(&request()).await.unwrap();

        assert_eq!(completion.text, "Loop 2 ist die Aktivierung.");
        assert_eq!(completion.model, "llama-3.3-70b-versatile");
        assert_eq!(completion.usage.total_tokens, 128);
    }

    #[tokio::test]
    async fn missing_content_yields_apology() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/openai/v1/chat/completions"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let client = GroqClient::new(&config_for(&server), "test-key").unwrap();
        let completion = client.complete(&request()).await.unwrap();

        assert_eq!(completion.text, NO_ANSWER_TEXT);
        assert_eq!(completion.model, "llama-3.3-70b-versatile");
        assert_eq!(completion.usage, Usage::default());
    }

    #[tokio::test]
    async fn http_error_maps_to_network_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = GroqClient::new(&config_for(&server), "wrong").unwrap();
        let err = client.complete(&request()).await.unwrap_err();

        match err {
            TripleLoopError::Network(message) => {
                assert!(message.contains("401"));
                assert!(message.contains("invalid api key"));
            }
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_maps_to_completion_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = GroqClient::new(&config_for(&server), "test-key").unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, TripleLoopError::Completion(_)));
    }
}
