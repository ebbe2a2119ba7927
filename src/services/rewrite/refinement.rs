// Refinement Loop
// Bounded generate -> transform -> score state machine. Each retry regenerates from the
// previous candidate at elevated intensity until the blended AI probability is at or
// below the acceptance threshold or the retry budget is spent.

use crate::models::StyleIntensity;
use crate::services::config_store::RefinementConfig;
use crate::services::detection::{blend, estimate, ClassifierGateway};
use rand::Rng;
use std::sync::Arc;
use tracing::info;

use super::generator::{GenerationError, RewriteOracle};
use super::lexicon::apply_replacements;
use super::style_jitter::style_jitter;

/// Why the loop stopped. Both are successful terminations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptReason {
    BelowThreshold,
    RetriesExhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementOutcome {
    pub text: String,
    pub blended_probability: f64,
    /// Regeneration rounds after the first candidate.
    pub retries: u32,
    pub reason: AcceptReason,
}

#[derive(Debug)]
enum RefinementState {
    Generating {
        input: String,
        intensity: StyleIntensity,
    },
    Transforming {
        candidate: String,
    },
    Scoring {
        candidate: String,
    },
    Accepted(RefinementOutcome),
}

/// Local transformation applied to every generated candidate: jitter, then the phrase table.
pub fn transform_candidate<R: Rng + ?Sized>(candidate: &str, rng: &mut R) -> String {
    apply_replacements(&style_jitter(candidate, rng))
}

pub struct RefinementLoop {
    generator: Arc<dyn RewriteOracle>,
    gateway: ClassifierGateway,
    accept_threshold: f64,
    max_retries: u32,
}

impl RefinementLoop {
    pub fn new(
        generator: Arc<dyn RewriteOracle>,
        gateway: ClassifierGateway,
        config: &RefinementConfig,
    ) -> Self {
        Self {
            generator,
            gateway,
            accept_threshold: config.accept_threshold,
            max_retries: config.max_retries,
        }
    }

    /// Drive the loop to acceptance. Only a generation failure is an error.
    pub async fn run<R>(&self, text: &str, rng: &mut R) -> Result<RefinementOutcome, GenerationError>
    where
        R: Rng + Send + ?Sized,
    {
        let mut retries = 0u32;
        let mut state = RefinementState::Generating {
            input: text.to_string(),
            intensity: StyleIntensity::Standard,
        };

        loop {
            state = match state {
                RefinementState::Generating { input, intensity } => {
                    let candidate = self.generator.generate(&input, intensity).await?;
                    RefinementState::Transforming { candidate }
                }
                RefinementState::Transforming { candidate } => RefinementState::Scoring {
                    candidate: transform_candidate(&candidate, rng),
                },
                RefinementState::Scoring { candidate } => {
                    let heuristic = estimate(&candidate);
                    let readings = self.gateway.assess(&candidate).await;
                    let blended = blend(heuristic, readings.primary, readings.secondary);
                    info!(
                        "[REFINE] round={} heuristic={:.3} blended={:.3}",
                        retries, heuristic, blended
                    );

                    if blended <= self.accept_threshold || retries >= self.max_retries {
                        let reason = if blended <= self.accept_threshold {
                            AcceptReason::BelowThreshold
                        } else {
                            AcceptReason::RetriesExhausted
                        };
                        RefinementState::Accepted(RefinementOutcome {
                            text: candidate,
                            blended_probability: blended,
                            retries,
                            reason,
                        })
                    } else {
                        retries += 1;
                        RefinementState::Generating {
                            input: candidate,
                            intensity: StyleIntensity::Elevated,
                        }
                    }
                }
                RefinementState::Accepted(outcome) => {
                    info!(
                        "[REFINE] accepted after {} retries ({:?}, blended={:.3})",
                        outcome.retries, outcome.reason, outcome.blended_probability
                    );
                    return Ok(outcome);
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Probability, ProbabilityEstimate};
    use crate::services::detection::ClassifierOracle;
    use crate::services::providers::ProviderError;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;
    use std::time::Duration;

    const REPETITIVE: &str = "the cat sat down and the cat sat down and the cat sat down \
        and the cat sat down and the cat sat down";

    /// Returns a fixed text and records every (input, intensity) it was asked for.
    struct ScriptedRewriter {
        output: String,
        calls: Mutex<Vec<(String, StyleIntensity)>>,
    }

    impl ScriptedRewriter {
        fn new(output: &str) -> Self {
            Self {
                output: output.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, StyleIntensity)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RewriteOracle for ScriptedRewriter {
        async fn generate(&self, text: &str, intensity: StyleIntensity) -> Result<String, GenerationError> {
            self.calls.lock().unwrap().push((text.to_string(), intensity));
            Ok(self.output.clone())
        }
    }

    struct FailingRewriter;

    #[async_trait]
    impl RewriteOracle for FailingRewriter {
        async fn generate(&self, _text: &str, _intensity: StyleIntensity) -> Result<String, GenerationError> {
            Err(ProviderError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            }
            .into())
        }
    }

    struct FixedOracle(ProbabilityEstimate);

    #[async_trait]
    impl ClassifierOracle for FixedOracle {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn classify(&self, _text: &str) -> ProbabilityEstimate {
            self.0
        }
    }

    fn gateway(primary: f64, secondary: f64) -> ClassifierGateway {
        ClassifierGateway::new(
            Some(Arc::new(FixedOracle(Probability::new(primary)))),
            Some(Arc::new(FixedOracle(Probability::new(secondary)))),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_accepts_first_candidate_below_threshold() {
        let rewriter = Arc::new(ScriptedRewriter::new("A rewritten sentence, therefore fine."));
        let refinement = RefinementLoop::new(rewriter.clone(), gateway(0.0, 0.0), &RefinementConfig::default());

        let outcome = refinement
            .run("Original text.", &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();

        assert_eq!(outcome.reason, AcceptReason::BelowThreshold);
        assert_eq!(outcome.retries, 0);
        assert!(outcome.blended_probability <= 0.12);
        // The phrase table ran on the candidate.
        assert!(!outcome.text.contains("therefore"));

        let calls = rewriter.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("Original text.".to_string(), StyleIntensity::Standard));
    }

    #[tokio::test]
    async fn test_retries_are_bounded_when_oracles_never_agree() {
        let rewriter = Arc::new(ScriptedRewriter::new(REPETITIVE));
        let refinement = RefinementLoop::new(rewriter.clone(), gateway(1.0, 1.0), &RefinementConfig::default());

        let outcome = refinement
            .run("input", &mut StdRng::seed_from_u64(11))
            .await
            .unwrap();

        assert_eq!(outcome.reason, AcceptReason::RetriesExhausted);
        assert_eq!(outcome.retries, 5);
        assert_eq!(rewriter.calls().len(), 6);
    }

    #[tokio::test]
    async fn test_bounded_with_all_oracles_unavailable() {
        let rewriter = Arc::new(ScriptedRewriter::new(REPETITIVE));
        let refinement =
            RefinementLoop::new(rewriter.clone(), ClassifierGateway::offline(), &RefinementConfig::default());

        let outcome = refinement
            .run("input", &mut StdRng::seed_from_u64(5))
            .await
            .unwrap();

        assert!(estimate(REPETITIVE) > 0.12);
        assert_eq!(outcome.reason, AcceptReason::RetriesExhausted);
        assert_eq!(outcome.blended_probability, estimate(&outcome.text));
        assert_eq!(rewriter.calls().len(), 6);
    }

    #[tokio::test]
    async fn test_retry_uses_previous_candidate_at_elevated_intensity() {
        let rewriter = Arc::new(ScriptedRewriter::new(REPETITIVE));
        let config = RefinementConfig {
            accept_threshold: 0.12,
            max_retries: 2,
        };
        let refinement = RefinementLoop::new(rewriter.clone(), gateway(1.0, 1.0), &config);

        let outcome = refinement
            .run("first input", &mut StdRng::seed_from_u64(9))
            .await
            .unwrap();

        let calls = rewriter.calls();
        assert_eq!(outcome.retries, 2);
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, "first input");
        assert_eq!(calls[0].1, StyleIntensity::Standard);
        for (input, intensity) in &calls[1..] {
            assert_ne!(input, "first input");
            assert_eq!(*intensity, StyleIntensity::Elevated);
        }
    }

    #[tokio::test]
    async fn test_generation_failure_is_fatal() {
        let refinement = RefinementLoop::new(
            Arc::new(FailingRewriter),
            gateway(0.0, 0.0),
            &RefinementConfig::default(),
        );
        let result = refinement.run("text", &mut StdRng::seed_from_u64(1)).await;
        assert!(matches!(result, Err(GenerationError::Provider(_))));
    }

    #[test]
    fn test_transform_candidate_applies_both_stages() {
        let out = transform_candidate(
            "However, the utilization of this methodology is significant.",
            &mut StdRng::seed_from_u64(2),
        );
        let lower = out.to_lowercase();
        assert!(!lower.contains("however"));
        assert!(!lower.contains("utilization"));
        assert!(lower.contains("method"));
    }
}
