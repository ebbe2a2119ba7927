// Text Processing Service
// Sentence/word segmentation and normalization shared by scoring, rewriting and provenance

use regex::Regex;
use std::sync::OnceLock;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-zA-Z']+").expect("word regex"))
}

fn sentence_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence break regex"))
}

fn non_alnum_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9\s]").expect("non-alnum regex"))
}

/// Collapse every whitespace run into a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    whitespace_re().replace_all(text, " ").trim().to_string()
}

/// Lowercase, strip everything but ASCII letters/digits/whitespace, then collapse whitespace.
/// This is the form used for fuzzy provenance comparison.
pub fn normalize_for_match(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = non_alnum_re().replace_all(&lowered, "");
    collapse_whitespace(&stripped)
}

/// Split after sentence-final punctuation that is followed by whitespace.
/// Keeps the punctuation on the left piece and drops the separating whitespace.
/// Empty pieces are dropped; no letter filtering is applied here.
pub fn split_sentence_pieces(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }

    let mut pieces = Vec::new();
    let mut cursor = 0usize;
    for m in sentence_break_re().find_iter(text) {
        // The punctuation is a single ASCII byte at the start of the match.
        let end = m.start() + 1;
        pieces.push(text[cursor..end].to_string());
        cursor = m.end();
    }
    if cursor < text.len() {
        pieces.push(text[cursor..].to_string());
    }

    pieces.retain(|p| !p.is_empty());
    pieces
}

/// Count the word tokens (letters and apostrophes) in a piece of text.
pub fn count_words(text: &str) -> usize {
    word_re().find_iter(text).count()
}

/// Immutable text with derived features computed on demand.
///
/// Nothing is cached: every accessor recomputes from the raw text, which keeps the
/// estimator stateless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSample {
    raw: String,
}

impl TextSample {
    pub fn new(text: &str) -> Self {
        Self {
            raw: text.to_string(),
        }
    }

    /// Whitespace-collapsed form that every feature is computed over.
    pub fn cleaned(&self) -> String {
        collapse_whitespace(&self.raw)
    }

    /// Sentences containing at least one ASCII letter.
    pub fn sentences(&self) -> Vec<String> {
        split_sentence_pieces(&self.cleaned())
            .into_iter()
            .filter(|s| s.chars().any(|c| c.is_ascii_alphabetic()))
            .collect()
    }

    /// Case-folded word tokens.
    pub fn words(&self) -> Vec<String> {
        let lowered = self.cleaned().to_lowercase();
        word_re()
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Each sentence with its whitespace removed, in order.
    pub fn compact_sentences(&self) -> Vec<String> {
        self.sentences()
            .iter()
            .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect())
            .collect()
    }

    /// Word count of every sentence, in order.
    pub fn sentence_word_counts(&self) -> Vec<usize> {
        self.sentences().iter().map(|s| count_words(s)).collect()
    }
}

// ============================================================================
// Numeric helpers (guarded: empty input yields 0)
// ============================================================================

pub fn safe_div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        0.0
    } else {
        a / b
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
