//! Text-generation client.
//!
//! The pipeline only needs one capability from the model provider: turn a
//! system prompt, a user context and a temperature into text. That capability
//! is the [`GenerationClient`] trait; [`OpenAiClient`] implements it against
//! any OpenAI-compatible `chat/completions` endpoint.

use async_trait::async_trait;
use deepcut_shared::{DeepCutError, GenerationConfig, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("DeepCut/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body echoed into error messages.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// One call to the text-generation service per pipeline stage.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate text for `user_context` under the instructions in `prompt`.
    ///
    /// No timeout is applied; callers that need one must impose it.
    async fn generate_section(
        &self,
        prompt: &str,
        user_context: &str,
        temperature: f32,
    ) -> Result<String>;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible client
// ---------------------------------------------------------------------------

/// Client for OpenAI-compatible chat-completions APIs.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiClient {
    /// Build a client from the `[generation]` config section and a resolved API key.
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DeepCutError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl GenerationClient for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.model, temperature))]
    async fn generate_section(
        &self,
        prompt: &str,
        user_context: &str,
        temperature: f32,
    ) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_context,
                },
            ],
            temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeepCutError::Generation(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DeepCutError::Generation(format!(
                "HTTP {status}: {}",
                truncate(&text, MAX_ERROR_BODY_CHARS)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DeepCutError::Generation(format!("invalid completion response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| DeepCutError::Generation("completion contained no content".into()))?;

        debug!(chars = content.len(), "completion received");
        Ok(content)
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
