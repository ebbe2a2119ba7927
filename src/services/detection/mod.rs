// Detection Module
// AI-likelihood scoring organized into specialized submodules:
// - estimator: Local multi-signal statistical heuristic, readability and style
// - gateway: Soft-fail adapters for the external classifier oracles
// - blending: Availability-dependent weighted blend of heuristic and oracles
// - scoring: Score-path pipeline (damping, blend, informational scores)

pub mod estimator;
pub mod gateway;
pub mod blending;
pub mod scoring;

// Re-export commonly used functions
pub use estimator::{estimate, readability, FeatureScores};
pub use gateway::{
    parse_labeled_response,
    parse_verdict,
    ClassifierGateway,
    ClassifierOracle,
    LabeledClassifier,
    OracleReadings,
    VerdictClassifier,
};
pub use blending::{blend, weights_for, BlendWeights};
pub use scoring::{damp_for_length, local_scores, score_text, LocalScores, ScoreReport};
