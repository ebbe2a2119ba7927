// Lexical Rewriter
// Ordered phrase-substitution table: formal connectives and stock AI phrasing
// replaced with plainer equivalents. Rules run in table order, case-insensitively,
// on whole words; each rule sees the output of the ones before it.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// (pattern, replacement). Patterns are matched as `(?i)\b<escaped>\b`.
const REPLACEMENTS: &[(&str, &str)] = &[
    // Phrases that contain a later single-word rule must run first
    ("a significant factor", "a major factor"),
    ("play a crucial role", "play an important role"),
    ("to conclude", "to finish"),
    ("to illustrate", "for example"),
    // Logical connectives
    ("therefore", "so"),
    ("thus", "so"),
    ("hence", "so"),
    ("consequently", "so"),
    ("as a result", "so"),
    ("as a consequence", "because of that"),
    ("moreover", "also"),
    ("furthermore", "also"),
    ("in addition", "also"),
    ("additionally", "also"),
    ("nevertheless", "still"),
    ("nonetheless", "still"),
    ("yet", "but"),
    ("on the other hand", "but"),
    ("notwithstanding", "despite"),
    ("however", "but"),
    ("conversely", "on the other hand"),
    ("alternatively", "or"),
    // Time and sequence
    ("subsequently", "later"),
    ("following this", "after this"),
    ("prior to", "before"),
    ("prior", "before"),
    ("commence", "begin"),
    ("commencing", "starting"),
    ("conclude", "end"),
    ("concluding", "ending"),
    ("end of the day", "in the end"),
    // Formal verbs
    ("utilize", "use"),
    ("employ", "use"),
    ("utilization", "use"),
    ("implement", "apply"),
    ("procure", "get"),
    ("obtain", "get"),
    ("acquire", "get"),
    ("establish", "set up"),
    ("modify", "change"),
    ("alter", "change"),
    ("assist", "help"),
    ("facilitate", "help"),
    ("articulate", "express"),
    ("illustrate", "show"),
    ("demonstrate", "show"),
    ("indicate", "show"),
    ("depict", "show"),
    ("depicts", "shows"),
    ("depicted", "shown"),
    ("convey", "show"),
    ("manifest", "show"),
    ("manifests", "shows"),
    ("attain", "reach"),
    ("attained", "reached"),
    // Nouns
    ("methodology", "method"),
    ("model", "example"),
    ("subsequent", "after"),
    ("commonly known as", "called"),
    ("per annum", "yearly"),
    ("per day", "daily"),
    ("approximately", "about"),
    ("broadly", "generally"),
    ("comprehensive", "complete"),
    ("optimal", "best"),
    // Adjectives and qualifiers
    ("comprising", "including"),
    ("comprise", "include"),
    ("comprises", "includes"),
    ("constitute", "form"),
    ("constitutes", "forms"),
    ("consist of", "include"),
    ("consists of", "includes"),
    ("predominantly", "mostly"),
    ("primarily", "mainly"),
    ("significant", "important"),
    ("crucial", "important"),
    ("essential", "necessary"),
    ("indispensable", "necessary"),
    ("advantageous", "helpful"),
    ("notably", "especially"),
    // Filler to drop or shorten
    ("in this article", ""),
    ("it is important to note that", "note that"),
    ("it is worth noting that", "note that"),
    ("it's important to consider", "consider"),
    ("one key aspect is", "one important part is"),
    ("when it comes to", "regarding"),
    ("when it comes", "regarding"),
    ("as such", "so"),
    ("as per", "according to"),
    // Canned intros and outros
    ("let me explain", ""),
    ("let's explore", "let's look at"),
    ("let us explore", "let's explore"),
    ("in essence", "basically"),
    ("in summary", "in short"),
    ("in conclusion", "in the end"),
    ("in other words", "basically,"),
    ("to put it simply", "simply put,"),
    // Illustrative phrases
    ("for instance", "for example"),
    ("as an example", "for example"),
    ("such as", "like"),
    ("via", "through"),
    // Cliches
    ("against the backdrop of", "amid"),
    ("so go ahead", "go ahead"),
    ("in the dynamic world of", "in the world of"),
    ("a tapestry of", "a mix of"),
    ("delve into", "explore"),
    ("embark on a journey", "begin a journey"),
    ("a treasure trove of", "a lot of"),
    ("in this digital world", "these days"),
    ("in the annals of", "throughout history"),
    ("in the realm of", "in the field of"),
    ("by leveraging", "by using"),
    ("core principles", "main principles"),
    ("our daily lives", "in everyday life"),
    ("the fundamentals of", "the basics of"),
    ("harness the power of", "use"),
    ("key to unlocking", "key to"),
];

/// Dash rules applied after the phrase table.
const DASH_RULES: &[(&str, &str)] = &[(r"\b\u{2014}", ":"), (r"\u{2013}", "-")];

struct Rule {
    re: Regex,
    replacement: &'static str,
}

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let phrases = REPLACEMENTS.iter().map(|(pattern, replacement)| Rule {
            re: Regex::new(&format!(r"(?i)\b{}\b", regex::escape(pattern)))
                .expect("replacement regex"),
            replacement,
        });
        let dashes = DASH_RULES.iter().map(|(pattern, replacement)| Rule {
            re: Regex::new(pattern).expect("dash regex"),
            replacement,
        });
        phrases.chain(dashes).collect()
    })
}

/// Carry a leading capital from the matched text onto the replacement.
fn match_case(matched: &str, replacement: &str) -> String {
    let starts_upper = matched.chars().next().map_or(false, |c| c.is_uppercase());
    if !starts_upper {
        return replacement.to_string();
    }
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Apply every substitution rule once, in table order.
pub fn apply_replacements(text: &str) -> String {
    let mut out = text.to_string();
    for rule in rules() {
        let replaced = rule
            .re
            .replace_all(&out, |caps: &Captures| match_case(&caps[0], rule.replacement));
        out = replaced.into_owned();
    }
    out
}
