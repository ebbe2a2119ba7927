// Rewrite Generator
// Upstream generative rewrite oracle: (text, intensity) -> rewritten text.
// Unlike the classifier oracles, failures here are fatal to the rewrite request.

use crate::models::StyleIntensity;
use crate::services::providers::{strip_code_fence, ChatOptions, ProviderClient, ProviderError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

const REWRITE_SYSTEM_PROMPT: &str = "You are an expert human editor and linguistic stylist. Rewrite the text so it reads like a person wrote it, preserving meaning and tone. Vary sentence lengths and rhythm, keep phrasing organic, use idioms sparingly, and prefer conversational constructions and contractions where natural. Avoid uniform cadence, stock transitions (e.g., moreover, additionally, in conclusion), and templated structures. Do not echo the same clause order or n-grams. Do not add or remove facts. Output plain text only, no explanations, no code fences, and avoid em dashes or unusual symbols.";

const ELEVATED_INSTRUCTION: &str = " Increase variance in sentence lengths and paragraph rhythm, reduce repetition, and diversify transitions.";

const REWRITE_OPTIONS: ChatOptions = ChatOptions {
    max_tokens: 800,
    temperature: 0.95,
    top_p: Some(0.95),
};

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Rewrite provider failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("Rewrite provider returned empty text")]
    EmptyOutput,
}

/// The generative collaborator of the refinement loop.
#[async_trait]
pub trait RewriteOracle: Send + Sync {
    async fn generate(&self, text: &str, intensity: StyleIntensity) -> Result<String, GenerationError>;
}

pub fn system_prompt(intensity: StyleIntensity) -> String {
    match intensity {
        StyleIntensity::Standard => REWRITE_SYSTEM_PROMPT.to_string(),
        StyleIntensity::Elevated => format!("{}{}", REWRITE_SYSTEM_PROMPT, ELEVATED_INSTRUCTION),
    }
}

/// Strip fences and dash variants the prompt already asks the model to avoid.
pub fn clean_generated(content: &str) -> String {
    strip_code_fence(content)
        .replace(['\u{2014}', '\u{2013}'], "-")
        .trim()
        .to_string()
}

/// Chat-completion rewriter on the Groq endpoint. Without a key every call fails
/// with `MissingApiKey`.
pub struct GroqRewriter {
    client: Arc<ProviderClient>,
    api_key: Option<String>,
    model: String,
}

impl GroqRewriter {
    pub fn new(client: Arc<ProviderClient>, api_key: Option<String>, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl RewriteOracle for GroqRewriter {
    async fn generate(&self, text: &str, intensity: StyleIntensity) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;
        let user_prompt = format!("Text to humanize:\n\"\"\"\n{}\n\"\"\"", text);
        let result = self
            .client
            .call_groq(
                &self.model,
                api_key,
                &system_prompt(intensity),
                &user_prompt,
                REWRITE_OPTIONS,
            )
            .await
            .map_err(|e| {
                warn!("[REFINE] {} rewrite call failed: {}", self.model, e);
                e
            })?;

        debug!(
            "[REFINE] {} intensity={} latency={}ms",
            self.model,
            intensity.level(),
            result.latency_ms
        );

        let cleaned = clean_generated(&result.content);
        if cleaned.is_empty() {
            return Err(GenerationError::EmptyOutput);
        }
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_by_intensity() {
        let standard = system_prompt(StyleIntensity::Standard);
        let elevated = system_prompt(StyleIntensity::Elevated);
        assert!(!standard.contains("Increase variance"));
        assert!(elevated.starts_with(&standard));
        assert!(elevated.ends_with("diversify transitions."));
    }

    #[test]
    fn test_clean_generated() {
        assert_eq!(
            clean_generated("```\nIt works \u{2014} mostly \u{2013} fine.\n```"),
            "It works - mostly - fine."
        );
        assert_eq!(clean_generated("   "), "");
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let rewriter = GroqRewriter::new(
            Arc::new(ProviderClient::with_urls(Some("http://127.0.0.1:9/unused"), None)),
            None,
            "model".to_string(),
        );
        let result = rewriter.generate("text", StyleIntensity::Standard).await;
        assert!(matches!(
            result,
            Err(GenerationError::Provider(ProviderError::MissingApiKey))
        ));
    }

    #[test]
    fn test_generation_error_wraps_provider_error() {
        let err: GenerationError = ProviderError::MissingContent.into();
        assert!(err.to_string().contains("Missing content"));
    }
}
