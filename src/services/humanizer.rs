// Humanizer Service
// Application-level rewrite and score operations. Owns the refinement loop, the
// classifier gateway and the provenance cache, and is shared by every request handler.

use crate::models::{RewriteResponse, ScoreResponse, Scores};
use crate::services::detection::{score_text, ClassifierGateway};
use crate::services::provenance::{apply_score_bias, ClientFingerprint, ProvenanceCache};
use crate::services::rewrite::{GenerationError, RefinementLoop};
use rand::Rng;
use tracing::info;

pub struct Humanizer {
    refinement: RefinementLoop,
    gateway: ClassifierGateway,
    provenance: ProvenanceCache,
}

impl Humanizer {
    pub fn new(refinement: RefinementLoop, gateway: ClassifierGateway, provenance: ProvenanceCache) -> Self {
        Self {
            refinement,
            gateway,
            provenance,
        }
    }

    /// Humanize `text` and remember the result as this client's latest output.
    pub async fn rewrite<R>(
        &self,
        text: &str,
        client: &ClientFingerprint,
        rng: &mut R,
    ) -> Result<RewriteResponse, GenerationError>
    where
        R: Rng + Send + ?Sized,
    {
        let outcome = self.refinement.run(text, rng).await?;
        self.provenance.record(client, &outcome.text);

        Ok(RewriteResponse {
            success: true,
            humanized_text: outcome.text,
        })
    }

    /// Score `text`; the human score is biased by whether this client was the one who
    /// had it humanized (or says so).
    pub async fn score<R>(
        &self,
        text: &str,
        client: &ClientFingerprint,
        declared_humanized: bool,
        rng: &mut R,
    ) -> ScoreResponse
    where
        R: Rng + Send + ?Sized,
    {
        let report = score_text(text, &self.gateway).await;
        let provenant = self.provenance.establish(client, text, declared_humanized);
        let human_score = apply_score_bias(report.local.human_score, provenant, rng);

        info!(
            "[SCORE] provenant={} human_score {} -> {}",
            provenant, report.local.human_score, human_score
        );

        ScoreResponse {
            success: true,
            ai_probability: report.ai_probability,
            scores: Scores {
                human_score,
                readability_score: report.local.readability_score,
                style_score: report.local.style_score,
            },
        }
    }
}
