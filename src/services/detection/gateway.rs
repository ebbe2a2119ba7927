// Classifier Gateway
// Uniform soft-fail wrapper around the two external AI-likelihood oracles:
// - Labeled oracle: Hugging Face text classification, score of the "AI"/"generated" label
// - Verdict oracle: chat model answering {"ai_probability": number}
//
// Every failure (transport, timeout, malformed payload, out-of-range value, missing key)
// folds into "unavailable" and is only logged.

use crate::models::{Probability, ProbabilityEstimate};
use crate::services::providers::{strip_code_fence, ChatOptions, ProviderClient};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const VERDICT_SYSTEM_PROMPT: &str = "Classify if the given text is AI-generated. Return only a JSON object: {\"ai_probability\": number between 0 and 1}. No explanation.";

const VERDICT_OPTIONS: ChatOptions = ChatOptions {
    max_tokens: 50,
    temperature: 0.0,
    top_p: None,
};

/// An external black-box classifier. Implementations never error: "no opinion" is `None`.
#[async_trait]
pub trait ClassifierOracle: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, text: &str) -> ProbabilityEstimate;
}

// ============================================================================
// Labeled classification oracle
// ============================================================================

pub struct LabeledClassifier {
    client: Arc<ProviderClient>,
    api_key: String,
    model: String,
}

impl LabeledClassifier {
    pub fn new(client: Arc<ProviderClient>, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl ClassifierOracle for LabeledClassifier {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn classify(&self, text: &str) -> ProbabilityEstimate {
        match self
            .client
            .call_text_classification(&self.model, &self.api_key, text)
            .await
        {
            Ok(body) => {
                let parsed = parse_labeled_response(&body);
                if parsed.is_none() {
                    warn!("[GATEWAY] {} returned no usable AI label", self.model);
                }
                parsed
            }
            Err(e) => {
                warn!("[GATEWAY] {} classification failed: {}", self.model, e);
                None
            }
        }
    }
}

/// Pick the score of the last label containing "ai" or "generated".
/// Accepts both `[{label, score}]` and `[[{label, score}]]`.
pub fn parse_labeled_response(body: &serde_json::Value) -> ProbabilityEstimate {
    let outer = body.as_array()?;
    let items = match outer.first() {
        Some(serde_json::Value::Array(inner)) => inner,
        _ => outer,
    };

    let mut score = None;
    for item in items {
        let label = item
            .get("label")
            .and_then(|l| l.as_str())
            .unwrap_or_default()
            .to_lowercase();
        if label.contains("ai") || label.contains("generated") {
            if let Some(s) = item.get("score").and_then(|s| s.as_f64()) {
                score = Some(s);
            }
        }
    }
    score.and_then(Probability::new)
}

// ============================================================================
// JSON verdict oracle
// ============================================================================

pub struct VerdictClassifier {
    client: Arc<ProviderClient>,
    api_key: String,
    model: String,
}

impl VerdictClassifier {
    pub fn new(client: Arc<ProviderClient>, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl ClassifierOracle for VerdictClassifier {
    fn name(&self) -> &str {
        "groq"
    }

    async fn classify(&self, text: &str) -> ProbabilityEstimate {
        let user_prompt = format!("Text:\n\"\"\"\n{}\n\"\"\"", text);
        match self
            .client
            .call_groq(
                &self.model,
                &self.api_key,
                VERDICT_SYSTEM_PROMPT,
                &user_prompt,
                VERDICT_OPTIONS,
            )
            .await
        {
            Ok(result) => {
                let parsed = parse_verdict(&result.content);
                if parsed.is_none() {
                    warn!(
                        "[GATEWAY] {} verdict unparseable: {:?}",
                        self.model, result.content
                    );
                }
                parsed
            }
            Err(e) => {
                warn!("[GATEWAY] {} verdict call failed: {}", self.model, e);
                None
            }
        }
    }
}

/// Parse `{"ai_probability": x}` out of free-form model output, tolerating code fences
/// and surrounding prose. Numeric strings are accepted; anything outside [0, 1] is not.
pub fn parse_verdict(content: &str) -> ProbabilityEstimate {
    let unfenced = strip_code_fence(content);
    let json_str = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if end > start => &unfenced[start..=end],
        _ => unfenced.as_str(),
    };

    let value: serde_json::Value = serde_json::from_str(json_str).ok()?;
    let raw = value.get("ai_probability")?;
    let number = match raw {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Probability::new(number)
}

// ============================================================================
// Gateway
// ============================================================================

/// Readings from both oracles for one scoring round.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OracleReadings {
    pub primary: ProbabilityEstimate,
    pub secondary: ProbabilityEstimate,
}

/// Holds the optional primary (labeled) and secondary (verdict) oracles.
#[derive(Clone)]
pub struct ClassifierGateway {
    primary: Option<Arc<dyn ClassifierOracle>>,
    secondary: Option<Arc<dyn ClassifierOracle>>,
    timeout: Duration,
}

impl ClassifierGateway {
    pub fn new(
        primary: Option<Arc<dyn ClassifierOracle>>,
        secondary: Option<Arc<dyn ClassifierOracle>>,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            timeout,
        }
    }

    /// A gateway with no oracles; every reading is unavailable.
    pub fn offline() -> Self {
        Self::new(None, None, Duration::from_secs(1))
    }

    /// Query both oracles concurrently and wait for both.
    pub async fn assess(&self, text: &str) -> OracleReadings {
        let (primary, secondary) = tokio::join!(
            self.ask(self.primary.as_deref(), text),
            self.ask(self.secondary.as_deref(), text)
        );
        debug!(
            "[GATEWAY] readings primary={:?} secondary={:?}",
            primary.map(|p| p.value()),
            secondary.map(|p| p.value())
        );
        OracleReadings { primary, secondary }
    }

    async fn ask(&self, oracle: Option<&dyn ClassifierOracle>, text: &str) -> ProbabilityEstimate {
        let oracle = oracle?;
        match tokio::time::timeout(self.timeout, oracle.classify(text)).await {
            Ok(estimate) => estimate,
            Err(_) => {
                warn!(
                    "[GATEWAY] {} timed out after {}s",
                    oracle.name(),
                    self.timeout.as_secs()
                );
                None
            }
        }
    }
}
