// AI Provider Service
// HTTP transport for the Groq chat-completions API and Hugging Face inference API

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const GROQ_DEFAULT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const HF_DEFAULT_URL: &str = "https://api-inference.huggingface.co/models";

const HTTP_TIMEOUT_SECS: u64 = 80;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: i32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// Sampling settings for one chat completion.
#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    pub max_tokens: i32,
    pub temperature: f64,
    pub top_p: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

pub struct ProviderClient {
    client: Client,
    groq_url: String,
    hf_url: String,
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        let groq_url = env::var("GROQ_API_URL").unwrap_or_else(|_| GROQ_DEFAULT_URL.to_string());
        let hf_url = env::var("HF_API_URL").unwrap_or_else(|_| HF_DEFAULT_URL.to_string());

        Self {
            client,
            groq_url,
            hf_url,
        }
    }

    /// Point both endpoints somewhere else (config-file base URLs, local mocks).
    pub fn with_urls(groq_url: Option<&str>, hf_url: Option<&str>) -> Self {
        let mut client = Self::new();
        if let Some(url) = groq_url {
            client.groq_url = url.to_string();
        }
        if let Some(url) = hf_url {
            client.hf_url = url.trim_end_matches('/').to_string();
        }
        client
    }

    pub async fn call_groq(
        &self,
        model: &str,
        api_key: &str,
        system: &str,
        user: &str,
        options: ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        self.call_chat_api(&self.groq_url, model, api_key, system, user, options)
            .await
    }

    /// Hugging Face text classification. Returns the raw JSON body; label layout varies by model.
    pub async fn call_text_classification(
        &self,
        model: &str,
        api_key: &str,
        text: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}/{}", self.hf_url, model);
        let request = serde_json::json!({ "inputs": text });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))
    }

    async fn call_chat_api(
        &self,
        url: &str,
        model: &str,
        api_key: &str,
        system: &str,
        user: &str,
        options: ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
        };

        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = data
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|c| c.trim().to_string())
            .ok_or(ProviderError::MissingContent)?;

        Ok(ChatResult {
            content,
            latency_ms,
        })
    }
}

/// Get API key from environment or config file
pub fn get_api_key(provider: &str) -> Option<String> {
    // Try environment variables first
    let env_keys = match provider {
        "groq" => vec!["GROQ_API_KEY", "HUMANIZER_GROQ_API_KEY"],
        "huggingface" | "hf" => vec!["HF_API_KEY", "HUMANIZER_HF_API_KEY"],
        _ => vec![],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    // Try config file
    if let Some(config_dir) = super::ConfigStore::default_config_dir() {
        let store = super::ConfigStore::new(config_dir);
        if let Ok(Some(key)) = store.get_api_key(provider) {
            return Some(key);
        }
    }

    None
}

/// Strip a surrounding ``` fence (with optional language tag) from model output.
pub fn strip_code_fence(content: &str) -> String {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let after_open = &trimmed[3..];
    // Drop the language tag, if any, up to the first newline.
    let tag_len = after_open
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(after_open.len());
    let mut body = &after_open[tag_len..];
    body = body.strip_prefix('\n').unwrap_or(body);
    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim().to_string()
}
