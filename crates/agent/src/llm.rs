use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use concierge_core::config::{LlmConfig, LlmProvider};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

/// Returned when the provider answers successfully but without any text.
pub const EMPTY_COMPLETION_REPLY: &str = "Sorry, I could not generate a response.";

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { temperature: 0.7, max_output_tokens: 800 }
    }
}

/// Transport shared by every provider: one reqwest client, a base URL and a
/// bounded retry budget for transport failures, 429 and 5xx responses.
#[derive(Clone, Debug)]
struct Transport {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl Transport {
    fn new(base_url: &str, timeout: Duration, max_retries: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for LLM provider")?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), max_retries })
    }

    async fn post_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            let mut request = self.http.post(&url).query(query).json(body);
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }

            let outcome = request.send().await;
            let retryable = match &outcome {
                Ok(response) => is_retryable(response.status()),
                Err(error) => error.is_timeout() || error.is_connect() || error.is_request(),
            };

            if retryable && attempt < self.max_retries {
                attempt += 1;
                tracing::warn!(
                    event_name = "llm.request.retry",
                    attempt,
                    max_retries = self.max_retries,
                    "retrying LLM request"
                );
                tokio::time::sleep(backoff(attempt)).await;
                continue;
            }

            let response = outcome.context("LLM request failed")?;
            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(anyhow!("LLM provider returned {status}: {}", truncate(&detail, 300)));
            }

            return response.json::<Value>().await.context("LLM response was not valid JSON");
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(250 * u64::from(attempt.min(8)))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

pub struct GeminiClient {
    transport: Transport,
    model: String,
    api_key: SecretString,
    settings: GenerationSettings,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig, api_key: SecretString) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(
                &config.effective_base_url(),
                Duration::from_secs(config.timeout_secs),
                config.max_retries,
            )?,
            model: config.model.clone(),
            api_key,
            settings: settings_from(config),
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let path = format!("/models/{}:generateContent", self.model);
        let body = gemini_request_body(prompt, &self.settings);
        let response = self
            .transport
            .post_json(&path, &[("key", self.api_key.expose_secret())], None, &body)
            .await?;
        Ok(gemini_response_text(&response).unwrap_or_else(|| EMPTY_COMPLETION_REPLY.to_string()))
    }
}

pub struct OpenAiClient {
    transport: Transport,
    model: String,
    api_key: SecretString,
    settings: GenerationSettings,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig, api_key: SecretString) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(
                &config.effective_base_url(),
                Duration::from_secs(config.timeout_secs),
                config.max_retries,
            )?,
            model: config.model.clone(),
            api_key,
            settings: settings_from(config),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_output_tokens,
        });
        let response = self
            .transport
            .post_json("/chat/completions", &[], Some(self.api_key.expose_secret()), &body)
            .await?;
        Ok(openai_response_text(&response).unwrap_or_else(|| EMPTY_COMPLETION_REPLY.to_string()))
    }
}

pub struct OllamaClient {
    transport: Transport,
    model: String,
    settings: GenerationSettings,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(
                &config.effective_base_url(),
                Duration::from_secs(config.timeout_secs),
                config.max_retries,
            )?,
            model: config.model.clone(),
            settings: settings_from(config),
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.settings.temperature,
                "num_predict": self.settings.max_output_tokens,
            },
        });
        let response = self.transport.post_json("/api/generate", &[], None, &body).await?;
        Ok(ollama_response_text(&response).unwrap_or_else(|| EMPTY_COMPLETION_REPLY.to_string()))
    }
}

fn settings_from(config: &LlmConfig) -> GenerationSettings {
    GenerationSettings {
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
    }
}

/// Builds the configured provider client. `Ok(None)` means a hosted provider
/// was selected without an API key; chat then reports itself unconfigured.
pub fn build_client(config: &LlmConfig) -> Result<Option<Arc<dyn LlmClient>>> {
    let key = config.usable_api_key().map(|key| SecretString::from(key.to_string()));

    let client: Arc<dyn LlmClient> = match (config.provider, key) {
        (LlmProvider::Gemini, Some(key)) => Arc::new(GeminiClient::new(config, key)?),
        (LlmProvider::OpenAi, Some(key)) => Arc::new(OpenAiClient::new(config, key)?),
        (LlmProvider::Ollama, _) => Arc::new(OllamaClient::new(config)?),
        (LlmProvider::Gemini | LlmProvider::OpenAi, None) => return Ok(None),
    };

    Ok(Some(client))
}

pub fn gemini_request_body(prompt: &str, settings: &GenerationSettings) -> Value {
    json!({
        "contents": [{"parts": [{"text": prompt}]}],
        "generationConfig": {
            "temperature": settings.temperature,
            "maxOutputTokens": settings.max_output_tokens,
        },
    })
}

pub fn gemini_response_text(response: &Value) -> Option<String> {
    non_blank(response.pointer("/candidates/0/content/parts/0/text"))
}

pub fn openai_response_text(response: &Value) -> Option<String> {
    non_blank(response.pointer("/choices/0/message/content"))
}

pub fn ollama_response_text(response: &Value) -> Option<String> {
    non_blank(response.get("response"))
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).filter(|text| !text.trim().is_empty()).map(str::to_string)
}
