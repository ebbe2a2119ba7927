// Provenance Service
// Remembers the last humanized output per client and decides whether a scored text
// is that output (exact hash or fuzzy similarity). Also holds the score-bias policy
// that depends on that decision.

use crate::services::config_store::ProvenanceConfig;
use crate::services::text_processor::{collapse_whitespace, normalize_for_match};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const JACCARD_WEIGHT: f64 = 0.5;
const DICE_WEIGHT: f64 = 0.5;

const BIAS_TARGET: u8 = 80;
const BIAS_MAX_UPLIFT: u8 = 15;
/// Exclusive upper bound of the random bump added on top of the gap to the target.
const BIAS_JITTER: u8 = 6;
const COLD_CEILING: u8 = 75;
const COLD_FORCED_MIN: u8 = 70;
const COLD_FORCED_MAX: u8 = 74;

// ============================================================================
// Fingerprint
// ============================================================================

/// Best-effort client identity: `<ip>::<user agent>`. Not a security boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientFingerprint(String);

impl ClientFingerprint {
    /// First `X-Forwarded-For` entry wins, then the peer address, then `unknown`.
    pub fn from_parts(
        forwarded_for: Option<&str>,
        peer: Option<IpAddr>,
        user_agent: Option<&str>,
    ) -> Self {
        let forwarded = forwarded_for
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let ip = forwarded
            .or_else(|| peer.map(|p| p.to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        Self(format!("{}::{}", ip, user_agent.unwrap_or_default()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Hashing and similarity
// ============================================================================

/// SHA-256 hex of the whitespace-collapsed text. Case and punctuation are significant.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(collapse_whitespace(text).as_bytes());
    hex::encode(hasher.finalize())
}

/// Jaccard similarity of two token sets; 0 when both are empty.
pub fn jaccard(a: &[&str], b: &[&str]) -> f64 {
    let a: HashSet<&str> = a.iter().copied().collect();
    let b: HashSet<&str> = b.iter().copied().collect();
    let inter = a.intersection(&b).count();
    let union = a.len() + b.len() - inter;
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}

fn char_bigrams(s: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Sørensen-Dice coefficient over character bigram multisets; 0 if either side has none.
pub fn bigram_dice(a: &str, b: &str) -> f64 {
    let a_grams = char_bigrams(a);
    let b_grams = char_bigrams(b);
    if a_grams.is_empty() || b_grams.is_empty() {
        return 0.0;
    }

    let mut remaining: HashMap<(char, char), usize> = HashMap::new();
    for g in &a_grams {
        *remaining.entry(*g).or_insert(0) += 1;
    }
    let mut inter = 0usize;
    for g in &b_grams {
        if let Some(count) = remaining.get_mut(g) {
            if *count > 0 {
                *count -= 1;
                inter += 1;
            }
        }
    }
    (2 * inter) as f64 / (a_grams.len() + b_grams.len()) as f64
}

/// Average of token Jaccard and character-bigram Dice over the normalized forms.
pub fn blended_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_for_match(a);
    let nb = normalize_for_match(b);
    let a_tokens: Vec<&str> = na.split_whitespace().collect();
    let b_tokens: Vec<&str> = nb.split_whitespace().collect();
    JACCARD_WEIGHT * jaccard(&a_tokens, &b_tokens) + DICE_WEIGHT * bigram_dice(&na, &nb)
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceRecord {
    pub hash: String,
    pub normalized: String,
}

impl ProvenanceRecord {
    pub fn for_text(text: &str) -> Self {
        Self {
            hash: content_hash(text),
            normalized: normalize_for_match(text),
        }
    }
}

/// Storage behind the provenance cache. One record per fingerprint; `put` replaces.
pub trait ProvenanceStore: Send + Sync {
    fn put(&self, key: &ClientFingerprint, record: ProvenanceRecord);
    fn get(&self, key: &ClientFingerprint) -> Option<ProvenanceRecord>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct StoredRecord {
    record: ProvenanceRecord,
    written_at: Instant,
}

/// In-process map bounded by entry count (oldest write evicted first) and age.
pub struct InMemoryProvenanceStore {
    entries: Mutex<HashMap<ClientFingerprint, StoredRecord>>,
    capacity: usize,
    ttl: Duration,
}

impl InMemoryProvenanceStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ClientFingerprint, StoredRecord>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, stored: &StoredRecord) -> bool {
        stored.written_at.elapsed() >= self.ttl
    }
}

impl ProvenanceStore for InMemoryProvenanceStore {
    fn put(&self, key: &ClientFingerprint, record: ProvenanceRecord) {
        let mut entries = self.lock();
        entries.retain(|_, stored| stored.written_at.elapsed() < self.ttl);

        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, stored)| stored.written_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!("[PROVENANCE] evicting {}", oldest);
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key.clone(),
            StoredRecord {
                record,
                written_at: Instant::now(),
            },
        );
    }

    fn get(&self, key: &ClientFingerprint) -> Option<ProvenanceRecord> {
        let entries = self.lock();
        entries
            .get(key)
            .filter(|stored| !self.is_expired(stored))
            .map(|stored| stored.record.clone())
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Provenance decisions over an injected store.
#[derive(Clone)]
pub struct ProvenanceCache {
    store: Arc<dyn ProvenanceStore>,
    similarity_threshold: f64,
}

impl ProvenanceCache {
    pub fn new(store: Arc<dyn ProvenanceStore>, similarity_threshold: f64) -> Self {
        Self {
            store,
            similarity_threshold,
        }
    }

    pub fn in_memory(config: &ProvenanceConfig) -> Self {
        let store = InMemoryProvenanceStore::new(config.capacity, Duration::from_secs(config.ttl_secs));
        Self::new(Arc::new(store), config.similarity_threshold)
    }

    /// Remember `text` as the latest humanized output for `client`.
    pub fn record(&self, client: &ClientFingerprint, text: &str) {
        self.store.put(client, ProvenanceRecord::for_text(text));
        debug!("[PROVENANCE] recorded output for {}", client);
    }

    /// Whether `text` is (or nearly is) the last output recorded for `client`.
    pub fn is_provenant(&self, client: &ClientFingerprint, text: &str) -> bool {
        let Some(record) = self.store.get(client) else {
            return false;
        };
        if record.hash == content_hash(text) {
            info!("[PROVENANCE] exact match for {}", client);
            return true;
        }
        let similarity = blended_similarity(text, &record.normalized);
        debug!("[PROVENANCE] similarity {:.3} for {}", similarity, client);
        similarity >= self.similarity_threshold
    }

    /// Cache match or an explicit caller declaration.
    pub fn establish(&self, client: &ClientFingerprint, text: &str, declared: bool) -> bool {
        declared || self.is_provenant(client, text)
    }
}

// ============================================================================
// Score bias
// ============================================================================

/// Adjust a 0-100 human score by provenance.
///
/// Provenant scores under 80 rise by `min(15, gap + bump)` with `bump` in `0..6`;
/// non-provenant scores of 75 or more are forced into `70..=74`.
pub fn apply_score_bias<R: Rng + ?Sized>(human_score: u8, provenant: bool, rng: &mut R) -> u8 {
    let score = human_score.min(100);
    if provenant {
        if score < BIAS_TARGET {
            let gap = BIAS_TARGET - score;
            let bump = rng.random_range(0..BIAS_JITTER);
            let uplift = BIAS_MAX_UPLIFT.min(gap + bump);
            (score + uplift).min(100)
        } else {
            score
        }
    } else if score >= COLD_CEILING {
        rng.random_range(COLD_FORCED_MIN..=COLD_FORCED_MAX)
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const HUMANIZED: &str = "Honestly, the project ran late, but the team kept its spirits up. \
        We shipped the first build in March, fixed the worst bugs in April, and by May \
        most customers had stopped complaining about the slow search page.";

    const UNRELATED: &str = "Tide pools form where the ocean retreats twice a day, leaving \
        anemones, crabs and small fish stranded in shallow basins of warm salt water.";

    fn client(ua: &str) -> ClientFingerprint {
        ClientFingerprint::from_parts(None, Some("10.0.0.1".parse().unwrap()), Some(ua))
    }

    fn cache() -> ProvenanceCache {
        ProvenanceCache::in_memory(&ProvenanceConfig::default())
    }

    #[test]
    fn test_fingerprint_sources() {
        let peer: IpAddr = "192.168.1.5".parse().unwrap();
        assert_eq!(
            ClientFingerprint::from_parts(Some("203.0.113.7, 10.0.0.1"), Some(peer), Some("curl/8")).as_str(),
            "203.0.113.7::curl/8"
        );
        assert_eq!(
            ClientFingerprint::from_parts(Some("  "), Some(peer), None).as_str(),
            "192.168.1.5::"
        );
        assert_eq!(ClientFingerprint::from_parts(None, None, Some("ua")).as_str(), "unknown::ua");
    }

    #[test]
    fn test_content_hash_ignores_whitespace_runs_only() {
        assert_eq!(content_hash("a  b\nc"), content_hash("a b c"));
        assert_ne!(content_hash("A b c"), content_hash("a b c"));
        assert_eq!(content_hash("").len(), 64);
    }

    #[test]
    fn test_jaccard_and_dice_edges() {
        assert_eq!(jaccard(&[], &[]), 0.0);
        assert_eq!(jaccard(&["a", "b"], &["b", "a", "a"]), 1.0);
        assert_eq!(bigram_dice("a", "ab"), 0.0);
        assert_eq!(bigram_dice("abc", "abc"), 1.0);
        // "aaa" has two "aa" bigrams, "aa" has one: multiset overlap is 1.
        assert!((bigram_dice("aaa", "aa") - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_exact_match_establishes_provenance() {
        let cache = cache();
        let who = client("browser");
        cache.record(&who, HUMANIZED);
        assert!(cache.is_provenant(&who, HUMANIZED));
    }

    #[test]
    fn test_punctuation_and_whitespace_edits_still_match() {
        let cache = cache();
        let who = client("browser");
        cache.record(&who, HUMANIZED);

        let edited = HUMANIZED.replace(", ", " ,  ").replace('.', "!");
        assert!(blended_similarity(&edited, HUMANIZED) >= 0.92);
        assert!(cache.is_provenant(&who, &edited));
    }

    #[test]
    fn test_unrelated_text_does_not_match() {
        let cache = cache();
        let who = client("browser");
        cache.record(&who, HUMANIZED);
        assert!(blended_similarity(UNRELATED, HUMANIZED) < 0.6);
        assert!(!cache.is_provenant(&who, UNRELATED));
    }

    #[test]
    fn test_provenance_is_per_client() {
        let cache = cache();
        cache.record(&client("browser"), HUMANIZED);
        assert!(!cache.is_provenant(&client("other"), HUMANIZED));
    }

    #[test]
    fn test_latest_record_replaces_previous() {
        let cache = cache();
        let who = client("browser");
        cache.record(&who, HUMANIZED);
        cache.record(&who, UNRELATED);
        assert!(cache.is_provenant(&who, UNRELATED));
        assert!(!cache.is_provenant(&who, HUMANIZED));
    }

    #[test]
    fn test_declared_flag_is_honored() {
        let cache = cache();
        assert!(cache.establish(&client("x"), UNRELATED, true));
        assert!(!cache.establish(&client("x"), UNRELATED, false));
    }

    #[test]
    fn test_store_capacity_evicts_oldest_write() {
        let store = InMemoryProvenanceStore::new(2, Duration::from_secs(60));
        store.put(&client("a"), ProvenanceRecord::for_text("one"));
        std::thread::sleep(Duration::from_millis(2));
        store.put(&client("b"), ProvenanceRecord::for_text("two"));
        std::thread::sleep(Duration::from_millis(2));
        store.put(&client("c"), ProvenanceRecord::for_text("three"));

        assert_eq!(store.len(), 2);
        assert!(store.get(&client("a")).is_none());
        assert!(store.get(&client("b")).is_some());
        assert!(store.get(&client("c")).is_some());
    }

    #[test]
    fn test_store_ttl_expires_records() {
        let store = InMemoryProvenanceStore::new(10, Duration::ZERO);
        store.put(&client("a"), ProvenanceRecord::for_text("one"));
        assert!(store.get(&client("a")).is_none());
    }

    #[test]
    fn test_bias_provenant_from_sixty() {
        for seed in 0..64 {
            let biased = apply_score_bias(60, true, &mut StdRng::seed_from_u64(seed));
            assert!((74..=81).contains(&biased), "got {}", biased);
        }
    }

    #[test]
    fn test_bias_provenant_near_target() {
        for seed in 0..64 {
            let biased = apply_score_bias(78, true, &mut StdRng::seed_from_u64(seed));
            assert!((80..=85).contains(&biased), "got {}", biased);
        }
        assert_eq!(apply_score_bias(90, true, &mut StdRng::seed_from_u64(0)), 90);
    }

    #[test]
    fn test_bias_cold_score_is_forced_down() {
        for score in [75u8, 88, 100] {
            for seed in 0..32 {
                let biased = apply_score_bias(score, false, &mut StdRng::seed_from_u64(seed));
                assert!((70..=74).contains(&biased), "got {}", biased);
            }
        }
        assert_eq!(apply_score_bias(74, false, &mut StdRng::seed_from_u64(0)), 74);
        assert_eq!(apply_score_bias(20, false, &mut StdRng::seed_from_u64(0)), 20);
    }
}
