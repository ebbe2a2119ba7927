// Statistical Estimator
// Multi-signal AI-likelihood heuristic over a text sample
//
// Every sub-score lives on a 0-100 scale. The composite only penalizes sub-scores
// that fall below the human-typical baseline of 60.

use crate::services::text_processor::{mean, safe_div, std_dev, TextSample};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

const HUMAN_BASELINE: f64 = 60.0;
const BURSTINESS_SCALE: f64 = 12.0;
const PUNCT_CLASS_SIZE: f64 = 8.0;
const STOPWORD_IDEAL: f64 = 0.5;
const ENTROPY_STD_SCALE: f64 = 0.8;
const ENTROPY_IDEAL: f64 = 3.7;
const AVG_WORD_LEN_IDEAL: f64 = 4.7;

const STOPWORDS: &[&str] = &[
    "the", "is", "in", "at", "of", "on", "and", "a", "to", "for", "it", "that", "this", "as",
    "with", "by", "an", "be", "or", "from", "are", "was", "were", "but", "not", "have", "has",
    "had", "you", "we", "they", "he", "she", "them", "his", "her", "their", "our", "your", "i",
    "my",
];

const PUNCTUATION_CLASS: &[char] = &['.', ',', ';', ':', '!', '?', '"', '\'', '(', ')', '-'];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

fn syllable_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:[^laeiouy]es|ed|[^laeiouy]e)$").expect("suffix regex"))
}

fn vowel_group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[aeiouy]{1,2}").expect("vowel regex"))
}

#[inline]
fn clamp_score(x: f64) -> f64 {
    x.clamp(0.0, 100.0)
}

#[inline]
fn deficiency(score: f64) -> f64 {
    (HUMAN_BASELINE - score).max(0.0)
}

/// All sub-scores for one sample, each on 0-100.
#[derive(Debug, Clone, Copy, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeatureScores {
    pub repetition: f64,
    pub burstiness: f64,
    pub stopword: f64,
    pub punctuation_diversity: f64,
    pub type_token: f64,
    pub entropy_std: f64,
    pub entropy_mean: f64,
    pub avg_word_length: f64,
    pub word_count: usize,
}

impl FeatureScores {
    pub fn compute(sample: &TextSample) -> Self {
        let cleaned = sample.cleaned();
        let words = sample.words();

        let lens: Vec<f64> = sample
            .sentence_word_counts()
            .into_iter()
            .map(|n| n as f64)
            .collect();
        let burstiness = clamp_score(std_dev(&lens) / BURSTINESS_SCALE * 100.0);

        let unique: HashSet<&str> = words.iter().map(String::as_str).collect();
        let ttr = safe_div(unique.len() as f64, words.len().max(1) as f64);
        let type_token = clamp_score(ttr * 100.0);

        let repetition = 100.0 - clamp_score(repeated_ngram_overflow(&words) as f64 * 3.0);

        let stop_count = words.iter().filter(|w| stopwords().contains(w.as_str())).count();
        let stop_ratio = safe_div(stop_count as f64, words.len().max(1) as f64);
        let stopword = (100.0 - (stop_ratio - STOPWORD_IDEAL).abs() * 300.0).max(0.0);

        let distinct_punct: HashSet<char> = cleaned
            .chars()
            .filter(|c| PUNCTUATION_CLASS.contains(c))
            .collect();
        let punctuation_diversity =
            clamp_score(distinct_punct.len() as f64 / PUNCT_CLASS_SIZE * 100.0);

        let entropies: Vec<f64> = sample
            .compact_sentences()
            .iter()
            .map(|s| shannon_entropy(s))
            .collect();
        let entropy_std = clamp_score(std_dev(&entropies) / ENTROPY_STD_SCALE * 100.0);
        let entropy_mean = clamp_score(100.0 - (mean(&entropies) - ENTROPY_IDEAL).abs() * 40.0);

        let word_lens: Vec<f64> = words.iter().map(|w| w.chars().count() as f64).collect();
        let avg_word_length =
            clamp_score(100.0 - (mean(&word_lens) - AVG_WORD_LEN_IDEAL).abs() * 25.0);

        Self {
            repetition,
            burstiness,
            stopword,
            punctuation_diversity,
            type_token,
            entropy_std,
            entropy_mean,
            avg_word_length,
            word_count: words.len(),
        }
    }

    /// Composite AI-likelihood signal on 0-100.
    pub fn ai_signal(&self) -> f64 {
        (100.0 - self.repetition) * 0.25
            + deficiency(self.burstiness) * 0.20
            + deficiency(self.stopword) * 0.15
            + deficiency(self.punctuation_diversity) * 0.10
            + deficiency(self.type_token) * 0.10
            + deficiency(self.entropy_std) * 0.12
            + deficiency(self.entropy_mean) * 0.08
    }

    /// Informational style composite on 0-100; not part of the blend.
    pub fn style_score(&self) -> f64 {
        0.30 * self.burstiness
            + 0.20 * self.punctuation_diversity
            + 0.25 * self.repetition
            + 0.15 * self.type_token
            + 0.10 * self.avg_word_length
    }
}

/// Heuristic AI-likelihood in [0, 1]. Pure and deterministic.
pub fn estimate(text: &str) -> f64 {
    let features = FeatureScores::compute(&TextSample::new(text));
    (features.ai_signal() / 100.0).clamp(0.0, 1.0)
}

/// Bigrams seen more than twice add their overflow; trigrams seen more than once add
/// double their overflow.
fn repeated_ngram_overflow(words: &[String]) -> usize {
    let bigrams = count_ngrams(words, 2);
    let trigrams = count_ngrams(words, 3);

    let bigram_overflow: usize = bigrams.values().filter(|&&v| v > 2).map(|&v| v - 2).sum();
    let trigram_overflow: usize = trigrams
        .values()
        .filter(|&&v| v > 1)
        .map(|&v| (v - 1) * 2)
        .sum();
    bigram_overflow + trigram_overflow
}

fn count_ngrams(words: &[String], n: usize) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    if words.len() < n {
        return counts;
    }
    for window in words.windows(n) {
        *counts.entry(window.join(" ")).or_insert(0) += 1;
    }
    counts
}

/// Shannon entropy in bits per character. Terms are summed in char order so the
/// float result is bit-identical across calls.
pub fn shannon_entropy(s: &str) -> f64 {
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return 0.0;
    }
    let mut freq: BTreeMap<char, usize> = BTreeMap::new();
    for c in &chars {
        *freq.entry(*c).or_insert(0) += 1;
    }
    let n = chars.len() as f64;
    freq.values()
        .map(|&count| {
            let p = count as f64 / n;
            -p * p.log2()
        })
        .sum()
}

/// Vowel-run syllable estimate; at least 1 for any word with letters.
pub fn count_syllables(word: &str) -> usize {
    let letters: String = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    if letters.is_empty() {
        return 0;
    }
    let suffixless = syllable_suffix_re().replace(&letters, "");
    let core = suffixless.strip_prefix('y').unwrap_or(suffixless.as_ref());
    vowel_group_re().find_iter(core).count().max(1)
}

/// Flesch Reading Ease clamped to 0-100.
pub fn readability(text: &str) -> f64 {
    let sample = TextSample::new(text);
    let words = sample.words();
    let sentence_count = sample.sentences().len().max(1) as f64;
    let word_count = words.len().max(1) as f64;
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();

    let asl = word_count / sentence_count;
    let asw = syllables as f64 / word_count;
    clamp_score(206.835 - 1.015 * asl - 84.6 * asw)
}
