// Style Jitter
// Randomized structural edits that break up uniform machine rhythm:
// - stock transitions ("However,", "Moreover,", ...) swapped for a random alternative
// - uniform runs of short sentences merged pairwise at random
// - very long sentences split at their first comma at random
//
// Randomness comes only from the caller's `Rng`, so a seeded generator reproduces output.

use crate::services::text_processor::{collapse_whitespace, count_words, split_sentence_pieces, std_dev};
use rand::Rng;
use regex::{Captures, Regex};
use std::sync::OnceLock;

const TRANSITION_ALTERNATIVES: &[&str] = &[
    "Plus,",
    "On top of that,",
    "Even so,",
    "That said,",
    "All in all,",
    "At the same time,",
];

/// Below this std-dev of sentence word counts the rhythm counts as uniform.
const UNIFORM_RHYTHM_STD: f64 = 3.0;
const SHORT_SENTENCE_CHARS: usize = 60;
const LONG_SENTENCE_CHARS: usize = 160;
const MERGE_PROBABILITY: f64 = 0.5;
const SPLIT_PROBABILITY: f64 = 0.6;

fn stock_transition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(however|moreover|additionally|furthermore|in conclusion|overall|in addition),",
        )
        .expect("transition regex")
    })
}

/// Run all three jitter stages over `text`.
pub fn style_jitter<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let collapsed = collapse_whitespace(text);
    let swapped = swap_stock_transitions(&collapsed, rng);

    let mut parts = split_sentence_pieces(&swapped);
    let lens: Vec<f64> = parts.iter().map(|p| count_words(p) as f64).collect();
    if std_dev(&lens) < UNIFORM_RHYTHM_STD && parts.len() > 2 {
        merge_short_neighbours(&mut parts, rng);
    }
    split_long_sentences(&mut parts, rng);

    collapse_whitespace(&parts.join(" "))
}

pub fn swap_stock_transitions<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    stock_transition_re()
        .replace_all(text, |caps: &Captures| {
            let pick = TRANSITION_ALTERNATIVES[rng.random_range(0..TRANSITION_ALTERNATIVES.len())];
            let starts_lower = caps[0].chars().next().map_or(false, |c| c.is_lowercase());
            if starts_lower {
                lowercase_first(pick)
            } else {
                pick.to_string()
            }
        })
        .into_owned()
}

/// Walk adjacent pairs; when both are short and the draw hits, fold the right sentence
/// into the left one with ", and". The left sentence's terminal punctuation is dropped
/// and the merged sentence ends the way the right one did. The element after a merge
/// is compared against the next one, so chains merge at most pairwise per pass.
fn merge_short_neighbours<R: Rng + ?Sized>(parts: &mut Vec<String>, rng: &mut R) {
    let mut i = 1;
    while i < parts.len() {
        let mergeable = parts[i - 1].chars().count() < SHORT_SENTENCE_CHARS
            && parts[i].chars().count() < SHORT_SENTENCE_CHARS;
        if mergeable && rng.random_bool(MERGE_PROBABILITY) {
            let right = parts.remove(i);
            let left = parts[i - 1].trim_end_matches(['.', '!', '?']).to_string();
            parts[i - 1] = collapse_whitespace(&format!("{}, and {}", left, soften_initial(&right)));
        }
        i += 1;
    }
}

/// Split sentences over the length limit at their first comma; the comma becomes a
/// period and the tail is capitalized.
fn split_long_sentences<R: Rng + ?Sized>(parts: &mut Vec<String>, rng: &mut R) {
    let mut i = 0;
    while i < parts.len() {
        let sentence = &parts[i];
        if sentence.chars().count() > LONG_SENTENCE_CHARS {
            if let Some(idx) = sentence.find(',') {
                let head = sentence[..idx].trim();
                let tail = sentence[idx + 1..].trim();
                if !head.is_empty() && !tail.is_empty() && rng.random_bool(SPLIT_PROBABILITY) {
                    let head = format!("{}.", head);
                    let tail = capitalize_first(tail);
                    parts[i] = head;
                    parts.insert(i + 1, tail);
                    i += 1;
                }
            }
        }
        i += 1;
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase a sentence's first letter only when the second is lowercase, so "I",
/// "I'm" and acronyms keep their capitals.
fn soften_initial(s: &str) -> String {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(f), Some(sec)) if f.is_uppercase() && sec.is_lowercase() => lowercase_first(s),
        _ => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const LONG_SENTENCE: &str = "The committee reviewed every proposal submitted during the spring session, \
        and after several rounds of heated discussion about budgets and timelines it finally \
        settled on a plan that nobody loved but everybody could live with.";

    const UNIFORM_SHORT: &str = "The cat sat on the mat. The dog lay by the door. \
        The bird sang in the tree. The fish swam in the bowl.";

    #[test]
    fn test_same_seed_same_output() {
        let text = format!("However, this works. {} {}", UNIFORM_SHORT, LONG_SENTENCE);
        let a = style_jitter(&text, &mut StdRng::seed_from_u64(7));
        let b = style_jitter(&text, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_stock_transitions_are_swapped() {
        let text = "However, the plan failed. Moreover, nobody noticed. In conclusion, we left.";
        for seed in 0..16 {
            let out = swap_stock_transitions(text, &mut StdRng::seed_from_u64(seed));
            assert!(!out.contains("However,"));
            assert!(!out.contains("Moreover,"));
            assert!(!out.contains("In conclusion,"));
            assert!(TRANSITION_ALTERNATIVES.iter().any(|alt| out.starts_with(alt)));
        }
    }

    #[test]
    fn test_mid_sentence_transition_stays_lowercase() {
        let out = swap_stock_transitions("It rained; however, we went.", &mut StdRng::seed_from_u64(1));
        assert!(out.starts_with("It rained; "));
        let tail = &out["It rained; ".len()..];
        assert!(tail.chars().next().unwrap().is_lowercase());
    }

    #[test]
    fn test_long_sentence_split_at_first_comma() {
        let mut split_seen = false;
        for seed in 0..32 {
            let out = style_jitter(LONG_SENTENCE, &mut StdRng::seed_from_u64(seed));
            if out != collapse_whitespace(LONG_SENTENCE) {
                split_seen = true;
                assert!(out.starts_with(
                    "The committee reviewed every proposal submitted during the spring session. And after"
                ));
            }
        }
        assert!(split_seen);
    }

    #[test]
    fn test_short_long_sentence_never_split() {
        let text = "Short, sweet, done.";
        for seed in 0..8 {
            assert_eq!(style_jitter(text, &mut StdRng::seed_from_u64(seed)), text);
        }
    }

    #[test]
    fn test_uniform_short_sentences_get_merged() {
        let mut merge_seen = false;
        for seed in 0..32 {
            let out = style_jitter(UNIFORM_SHORT, &mut StdRng::seed_from_u64(seed));
            if out.contains(", and the") {
                merge_seen = true;
            }
            // Words are never lost.
            assert_eq!(count_words(&out), count_words(UNIFORM_SHORT) + out.matches(", and ").count());
        }
        assert!(merge_seen);
    }

    #[test]
    fn test_exclamations_and_questions_merge_too() {
        let text = "Stop it now! The dog lay by the door. Why is it late? The fish swam in the bowl.";
        let mut merge_seen = false;
        for seed in 0..32 {
            let out = style_jitter(text, &mut StdRng::seed_from_u64(seed));
            if out.contains("now, and the") || out.contains("late, and the") {
                merge_seen = true;
            }
            assert!(!out.contains("!,") && !out.contains("?,"), "{:?}", out);
        }
        assert!(merge_seen);
    }

    #[test]
    fn test_varied_rhythm_is_not_merged() {
        let text = "Yes. The long winding road went on and on past farms, rivers and hills for miles. No.";
        for seed in 0..16 {
            let out = style_jitter(text, &mut StdRng::seed_from_u64(seed));
            assert!(!out.contains(", and "));
        }
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(style_jitter("", &mut StdRng::seed_from_u64(0)), "");
        assert_eq!(style_jitter("   \n ", &mut StdRng::seed_from_u64(0)), "");
    }

    #[test]
    fn test_soften_initial() {
        assert_eq!(soften_initial("The dog ran."), "the dog ran.");
        assert_eq!(soften_initial("I ran."), "I ran.");
        assert_eq!(soften_initial("NASA flew."), "NASA flew.");
        assert_eq!(soften_initial("I'm here."), "I'm here.");
    }
}
