// Rewrite Module
// Text humanization organized into specialized submodules:
// - lexicon: Ordered phrase-substitution table
// - style_jitter: Randomized transition swaps, sentence merges and splits
// - generator: Upstream generative rewrite oracle
// - refinement: Bounded generate/transform/score loop

pub mod lexicon;
pub mod style_jitter;
pub mod generator;
pub mod refinement;

pub use lexicon::apply_replacements;
pub use style_jitter::style_jitter;
pub use generator::{GenerationError, GroqRewriter, RewriteOracle};
pub use refinement::{transform_candidate, AcceptReason, RefinementLoop, RefinementOutcome};
