//! Text generation backends.
//!
//! The pipeline treats a language model as a black box that turns a system
//! prompt and a user prompt into text. [`ChatClient`] speaks the
//! OpenAI-compatible chat-completions protocol; tests plug in canned fakes.

use crate::config::{LlmConfig, ModelRole};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

/// Deadline and retry rules applied around every generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub attempts: usize,
    pub backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            attempts: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

impl From<&LlmConfig> for CallPolicy {
    fn from(config: &LlmConfig) -> Self {
        Self {
            timeout: config.timeout(),
            attempts: config.attempts,
            backoff: config.backoff(),
        }
    }
}

/// Run one generation under `policy`. Only transient failures are retried.
pub async fn generate_with_policy(
    generator: &dyn TextGenerator,
    system_prompt: &str,
    user_prompt: &str,
    policy: &CallPolicy,
) -> Result<String, LlmError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = tokio::time::timeout(
            policy.timeout,
            generator.generate(system_prompt, user_prompt),
        )
        .await
        .unwrap_or(Err(LlmError::Timeout(policy.timeout)));

        match outcome {
            Ok(text) => return Ok(text),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(
                    "Generation failed (attempt {}/{}): {}",
                    attempt, attempts, e
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client bound to one model.
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    json_mode: bool,
}

impl ChatClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, LlmError> {
        let client = Client::builder()
            .user_agent(format!("autoqa/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature: 0.3,
            json_mode: false,
        })
    }

    /// Build a client for `role`, reading the API key from the environment.
    /// The analysis client requests JSON replies.
    pub fn from_config(config: &LlmConfig, role: ModelRole) -> Result<Self, LlmError> {
        let key_var = config.resolved_api_key_env();
        let api_key = std::env::var(&key_var).map_err(|_| LlmError::MissingApiKey(key_var))?;
        let base_url = config.resolved_base_url()?;

        Ok(Self::new(&base_url, &api_key, config.model_for(role))?
            .with_temperature(config.temperature)
            .with_json_mode(role == ModelRole::Analysis))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.temperature,
            response_format: self.json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        debug!("Sending chat completion to {} ({})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

// Providers wrap the reason as {"error": {"message": ...}}.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
