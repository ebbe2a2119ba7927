// HumanizeAI Core Services

pub mod text_processor;
pub mod config_store;
pub mod providers;
pub mod detection;
pub mod rewrite;
pub mod provenance;
pub mod humanizer;

pub use text_processor::*;
pub use config_store::*;
pub use providers::*;
pub use humanizer::Humanizer;

pub use detection::{
    blend,
    estimate,
    local_scores,
    score_text,
    ClassifierGateway,
    ClassifierOracle,
    LabeledClassifier,
    OracleReadings,
    VerdictClassifier,
};
pub use rewrite::{
    apply_replacements,
    style_jitter,
    transform_candidate,
    GenerationError,
    GroqRewriter,
    RefinementLoop,
    RefinementOutcome,
    RewriteOracle,
};
pub use provenance::{
    apply_score_bias,
    blended_similarity,
    ClientFingerprint,
    InMemoryProvenanceStore,
    ProvenanceCache,
    ProvenanceStore,
};
