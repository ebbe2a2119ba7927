// HumanizeAI Data Models
// Wire types for the rewrite/score operations plus shared value types

use serde::{Deserialize, Serialize};

// ============ Probability ============

/// A single signal's opinion that a text is AI-generated, always within [0, 1].
///
/// An oracle with no opinion is represented as `Option::<Probability>::None`, never
/// as a zero value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Probability(f64);

impl Probability {
    /// Returns `None` for NaN, infinities and anything outside [0, 1].
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Clamp an arbitrary number into range. NaN collapses to 0.
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Estimate produced by one oracle adapter; `None` means "unavailable".
pub type ProbabilityEstimate = Option<Probability>;

// ============ Style Intensity ============

/// How aggressively the upstream generator is asked to restyle text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleIntensity {
    /// First pass over the caller's input.
    Standard,
    /// Retry pass over the previous candidate; asks for more rhythm and transition variance.
    Elevated,
}

impl StyleIntensity {
    pub fn level(self) -> u8 {
        match self {
            Self::Standard => 1,
            Self::Elevated => 2,
        }
    }
}

// ============ Requests ============

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RewriteRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoreRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Pull a non-empty text out of an optional request field.
pub fn required_text(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty())
}

// ============ Responses ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteResponse {
    pub success: bool,
    pub humanized_text: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scores {
    pub human_score: u8,
    pub readability_score: u8,
    pub style_score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub success: bool,
    pub ai_probability: f64,
    pub scores: Scores,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
