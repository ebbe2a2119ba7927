// Score Path
// Heuristic + oracle scoring for the score operation: length-damped heuristic,
// blended AI probability, and the informational readability/style numbers.

use crate::models::Probability;
use crate::services::text_processor::{collapse_whitespace, TextSample};
use tracing::info;

use super::blending::blend;
use super::estimator::{readability, FeatureScores};
use super::gateway::ClassifierGateway;

const SHORT_TEXT_WORDS: usize = 40;
const MEDIUM_TEXT_WORDS: usize = 80;
const SHORT_TEXT_DAMPING: f64 = 0.70;
const MEDIUM_TEXT_DAMPING: f64 = 0.85;

/// Local (oracle-free) measurements of one text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalScores {
    /// Heuristic AI probability after short-text damping.
    pub heuristic_probability: f64,
    /// `100 × (1 − heuristic_probability)`, rounded, before any provenance bias.
    pub human_score: u8,
    pub readability_score: u8,
    pub style_score: u8,
    pub word_count: usize,
}

/// Full score of one text, before provenance bias.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreReport {
    pub ai_probability: f64,
    pub local: LocalScores,
}

/// Short texts carry less statistical evidence, so their heuristic is scaled down.
pub fn damp_for_length(probability: f64, word_count: usize) -> f64 {
    if word_count < SHORT_TEXT_WORDS {
        probability * SHORT_TEXT_DAMPING
    } else if word_count < MEDIUM_TEXT_WORDS {
        probability * MEDIUM_TEXT_DAMPING
    } else {
        probability
    }
}

fn to_percent(x: f64) -> u8 {
    x.round().clamp(0.0, 100.0) as u8
}

pub fn local_scores(text: &str) -> LocalScores {
    let sample = TextSample::new(text);
    let features = FeatureScores::compute(&sample);

    let raw = Probability::saturating(features.ai_signal() / 100.0).value();
    let heuristic_probability = damp_for_length(raw, features.word_count);

    LocalScores {
        heuristic_probability,
        human_score: to_percent((1.0 - heuristic_probability) * 100.0),
        readability_score: to_percent(readability(text)),
        style_score: to_percent(features.style_score()),
        word_count: features.word_count,
    }
}

/// Score a text: local measurements plus both oracles, blended.
pub async fn score_text(text: &str, gateway: &ClassifierGateway) -> ScoreReport {
    let local = local_scores(text);
    let readings = gateway.assess(&collapse_whitespace(text)).await;
    let ai_probability = blend(local.heuristic_probability, readings.primary, readings.secondary);

    info!(
        "[SCORE] words={} heuristic={:.3} blended={:.3} primary={} secondary={}",
        local.word_count,
        local.heuristic_probability,
        ai_probability,
        readings.primary.is_some(),
        readings.secondary.is_some()
    );

    ScoreReport {
        ai_probability,
        local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbabilityEstimate;
    use crate::services::detection::ClassifierOracle;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingOracle {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ClassifierOracle for RecordingOracle {
        fn name(&self) -> &str {
            "recording"
        }

        async fn classify(&self, text: &str) -> ProbabilityEstimate {
            self.seen.lock().unwrap().push(text.to_string());
            Probability::new(0.5)
        }
    }

    #[test]
    fn test_damp_for_length() {
        assert!((damp_for_length(0.5, 10) - 0.35).abs() < 1e-12);
        assert!((damp_for_length(0.5, 39) - 0.35).abs() < 1e-12);
        assert!((damp_for_length(0.5, 40) - 0.425).abs() < 1e-12);
        assert!((damp_for_length(0.5, 79) - 0.425).abs() < 1e-12);
        assert_eq!(damp_for_length(0.5, 80), 0.5);
    }

    #[test]
    fn test_local_scores_are_percentages() {
        for text in ["", "Hello.", "The cat sat on the mat. It was warm, and quiet!"] {
            let scores = local_scores(text);
            assert!(scores.human_score <= 100);
            assert!(scores.readability_score <= 100);
            assert!(scores.style_score <= 100);
            assert!((0.0..=1.0).contains(&scores.heuristic_probability));
        }
    }

    #[test]
    fn test_human_score_matches_heuristic() {
        let scores = local_scores("Short text, really short. Yes!");
        let expected = ((1.0 - scores.heuristic_probability) * 100.0).round() as u8;
        assert_eq!(scores.human_score, expected);
    }

    #[tokio::test]
    async fn test_score_text_offline_uses_heuristic() {
        let text = "A plain sentence for scoring. Another one follows here.";
        let report = score_text(text, &ClassifierGateway::offline()).await;
        assert_eq!(report.ai_probability, report.local.heuristic_probability);
    }

    #[tokio::test]
    async fn test_oracles_receive_collapsed_text() {
        let primary = Arc::new(RecordingOracle::default());
        let secondary = Arc::new(RecordingOracle::default());
        let gateway = ClassifierGateway::new(
            Some(primary.clone() as Arc<dyn ClassifierOracle>),
            Some(secondary.clone() as Arc<dyn ClassifierOracle>),
            Duration::from_secs(1),
        );

        score_text("  First line.\n\n  Second\tline.  ", &gateway).await;

        assert_eq!(*primary.seen.lock().unwrap(), vec!["First line. Second line."]);
        assert_eq!(*secondary.seen.lock().unwrap(), vec!["First line. Second line."]);
    }
}
